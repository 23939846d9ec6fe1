//! Path utilities for storage-relative paths.
//!
//! Package archives and cache files address storage with `/`-separated
//! relative paths. These helpers reject traversal before anything is joined.

use crate::error::{PouchError, PouchResult};

/// Normalize a `/`-separated relative path by resolving `.` and `..`
pub fn normalize_path(path: &str) -> String {
    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                if components.last().map_or(true, |last| *last == "..") {
                    components.push("..");
                } else {
                    components.pop();
                }
            },
            other => components.push(other),
        }
    }

    components.join("/")
}

/// Check if a path stays below its base (no absolute path, no escaping `..`)
pub fn is_safe_path(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        return false;
    }

    let mut depth = 0i32;
    for component in path.split(['/', '\\']) {
        match component {
            "" | "." => {},
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            _ => depth += 1,
        }
    }

    true
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Join `path` under `base`, rejecting traversal
pub fn safe_join(base: &str, path: &str) -> PouchResult<String> {
    if !is_safe_path(path) {
        return Err(PouchError::extract(format!(
            "entry path escapes the package root: {}",
            path
        )));
    }

    let relative = normalize_path(path);
    let base = base.trim_end_matches('/');
    Ok(match (base.is_empty(), relative.is_empty()) {
        (true, _) => relative,
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, relative),
    })
}

/// Parent directory of a `/`-separated path, if any
pub fn parent_dir(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

/// Drop the archive's root folder (`package/`, or whatever the publisher used)
pub fn strip_root_segment(path: &str) -> &str {
    let path = path.trim_start_matches("./");
    match path.split_once('/') {
        Some((_, rest)) => rest,
        None => "",
    }
}
