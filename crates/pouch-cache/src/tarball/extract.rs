//! Tarball extraction into in-memory entries
//!
//! npm archives are gzip-compressed tarballs whose entries all live under a
//! single root folder (`package/` by convention). Extraction strips that
//! folder, rejects paths that would escape the package directory, and keeps
//! image files as raw bytes while everything else is decoded as UTF-8 text.

use std::io::Read;

use flate2::read::GzDecoder;
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::{is_binary_path, ArchiveEntry, EntryKind, FileContent};
use pouch_core::utils::{is_safe_path, normalize_path, strip_root_segment};
use tar::Archive;

/// Decompress and unpack a `.tgz` held in memory, preserving entry order
pub fn extract_entries(compressed: &[u8]) -> PouchResult<Vec<ArchiveEntry>> {
    let tar_bytes = gunzip(compressed)?;
    let mut archive = Archive::new(tar_bytes.as_slice());
    let mut entries = Vec::new();

    let iter = archive.entries().map_err(|e| PouchError::ExtractError {
        message: "failed to read tar stream".to_string(),
        source: Some(e),
    })?;

    for entry_result in iter {
        let mut entry = entry_result.map_err(|e| PouchError::ExtractError {
            message: "corrupt tar entry".to_string(),
            source: Some(e),
        })?;

        let kind = match entry.header().entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous | tar::EntryType::GNUSparse => {
                EntryKind::File
            },
            tar::EntryType::Directory => EntryKind::Directory,
            other => {
                tracing::debug!("Skipping tar entry of type {:?}", other);
                continue;
            },
        };

        let raw_path = entry
            .path()
            .map_err(|e| PouchError::ExtractError {
                message: "tar entry has an unreadable path".to_string(),
                source: Some(e),
            })?
            .to_string_lossy()
            .replace('\\', "/");

        let Some(path) = validate_entry_path(&raw_path)? else {
            continue;
        };

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| PouchError::ExtractError {
                message: format!("failed to read {}", raw_path),
                source: Some(e),
            })?;

        let content = if kind == EntryKind::File && is_binary_path(&path) {
            FileContent::Binary(data)
        } else {
            FileContent::Text(String::from_utf8_lossy(&data).into_owned())
        };

        entries.push(ArchiveEntry {
            path,
            content,
            kind,
        });
    }

    Ok(entries)
}

/// Inflate the whole gzip body up front so a truncated download fails before
/// any entry is produced
fn gunzip(compressed: &[u8]) -> PouchResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut tar_bytes = Vec::new();
    decoder
        .read_to_end(&mut tar_bytes)
        .map_err(|e| PouchError::ExtractError {
            message: "gzip decompression failed".to_string(),
            source: Some(e),
        })?;
    Ok(tar_bytes)
}

/// Strip the archive root and validate; `None` for the root folder itself
fn validate_entry_path(raw_path: &str) -> PouchResult<Option<String>> {
    if raw_path.starts_with('/') {
        return Err(PouchError::extract(format!(
            "absolute path in archive: {}",
            raw_path
        )));
    }

    let relative = strip_root_segment(raw_path);
    if !is_safe_path(relative) {
        return Err(PouchError::extract(format!(
            "directory traversal in archive: {}",
            raw_path
        )));
    }

    let normalized = normalize_path(relative);
    Ok((!normalized.is_empty()).then_some(normalized))
}
