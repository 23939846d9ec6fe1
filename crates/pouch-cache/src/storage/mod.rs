//! Path-addressed project storage.
//!
//! The installer only ever talks to a [`Storage`]: `/`-separated paths,
//! recursive `mkdir`, whole-file reads and writes. [`FsStorage`] maps those
//! paths below a root directory on disk; [`MemoryStorage`] keeps the tree in
//! memory for sandboxed hosts and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use dashmap::DashMap;
use pouch_core::error::{PouchError, PouchResult};
use pouch_core::utils::{is_safe_path, normalize_path, parent_dir};

/// Storage capability consumed by the installer and the run caches
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    async fn exists(&self, path: &str) -> PouchResult<bool>;

    /// Create a directory; with `recursive`, missing parents are created and
    /// an existing directory is not an error
    async fn mkdir(&self, path: &str, recursive: bool) -> PouchResult<()>;

    async fn write_file(&self, path: &str, contents: &[u8]) -> PouchResult<()>;

    async fn read_file(&self, path: &str) -> PouchResult<Vec<u8>>;

    async fn remove_file(&self, path: &str) -> PouchResult<()>;

    /// Names of the direct children of a directory
    async fn list(&self, path: &str) -> PouchResult<Vec<String>>;

    async fn read_to_string(&self, path: &str) -> PouchResult<String> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|e| PouchError::StorageError {
            path: path.to_string(),
            message: format!("file is not valid UTF-8: {}", e),
            source: None,
        })
    }
}

/// Storage backed by the local filesystem below `root`
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: Utf8PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Map a storage path below the root; leading `/` is relative to the root
    fn resolve(&self, path: &str) -> PouchResult<Utf8PathBuf> {
        let relative = path.trim_start_matches('/');
        if !is_safe_path(relative) {
            return Err(PouchError::StorageError {
                path: path.to_string(),
                message: "path escapes the storage root".to_string(),
                source: None,
            });
        }
        let normalized = normalize_path(relative);
        Ok(if normalized.is_empty() {
            self.root.clone()
        } else {
            self.root.join(normalized)
        })
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &str) -> PouchResult<bool> {
        let full = self.resolve(path)?;
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> PouchResult<()> {
        let full = self.resolve(path)?;
        let result = if recursive {
            tokio::fs::create_dir_all(&full).await
        } else {
            tokio::fs::create_dir(&full).await
        };
        result.map_err(|e| PouchError::storage(full.as_str(), e))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> PouchResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, contents)
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))
    }

    async fn read_file(&self, path: &str) -> PouchResult<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))
    }

    async fn remove_file(&self, path: &str) -> PouchResult<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))
    }

    async fn list(&self, path: &str) -> PouchResult<Vec<String>> {
        let full = self.resolve(path)?;
        let mut dir = tokio::fs::read_dir(&full)
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))?;

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| PouchError::storage(full.as_str(), e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Directory,
}

/// In-memory storage tree
///
/// Writes require the parent directory to exist, like a real filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: DashMap<String, Node>,
    operations: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of storage calls served so far
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Every file path currently stored, sorted
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .nodes
            .iter()
            .filter(|entry| matches!(entry.value(), Node::File(_)))
            .map(|entry| format!("/{}", entry.key()))
            .collect();
        paths.sort();
        paths
    }

    fn key(&self, path: &str) -> String {
        self.operations.fetch_add(1, Ordering::SeqCst);
        normalize_path(path.trim_start_matches('/'))
    }

    fn dir_exists(&self, key: &str) -> bool {
        key.is_empty() || matches!(self.nodes.get(key).as_deref(), Some(Node::Directory))
    }

    fn not_found(path: &str) -> PouchError {
        PouchError::storage(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        )
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &str) -> PouchResult<bool> {
        let key = self.key(path);
        Ok(key.is_empty() || self.nodes.contains_key(&key))
    }

    async fn mkdir(&self, path: &str, recursive: bool) -> PouchResult<()> {
        let key = self.key(path);
        if key.is_empty() {
            return Ok(());
        }

        if !recursive {
            let parent = parent_dir(&key).unwrap_or("");
            if !self.dir_exists(parent) {
                return Err(Self::not_found(path));
            }
            if self.nodes.contains_key(&key) {
                return Err(PouchError::storage(
                    path,
                    std::io::Error::new(std::io::ErrorKind::AlreadyExists, "already exists"),
                ));
            }
            self.nodes.insert(key, Node::Directory);
            return Ok(());
        }

        let mut prefix = String::new();
        for component in key.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            let entry = self.nodes.entry(prefix.clone()).or_insert(Node::Directory);
            if matches!(entry.value(), Node::File(_)) {
                return Err(PouchError::storage(
                    path,
                    std::io::Error::new(std::io::ErrorKind::AlreadyExists, "a file is in the way"),
                ));
            }
        }
        Ok(())
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> PouchResult<()> {
        let key = self.key(path);
        let parent = parent_dir(&key).unwrap_or("");
        if !self.dir_exists(parent) {
            return Err(Self::not_found(path));
        }
        self.nodes.insert(key, Node::File(contents.to_vec()));
        Ok(())
    }

    async fn read_file(&self, path: &str) -> PouchResult<Vec<u8>> {
        let key = self.key(path);
        match self.nodes.get(&key).as_deref() {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            _ => Err(Self::not_found(path)),
        }
    }

    async fn remove_file(&self, path: &str) -> PouchResult<()> {
        let key = self.key(path);
        match self.nodes.remove_if(&key, |_, node| matches!(node, Node::File(_))) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(path)),
        }
    }

    async fn list(&self, path: &str) -> PouchResult<Vec<String>> {
        let key = self.key(path);
        if !self.dir_exists(&key) {
            return Err(Self::not_found(path));
        }

        let mut names: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|entry| {
                let child = if key.is_empty() {
                    entry.key().as_str()
                } else {
                    entry.key().strip_prefix(key.as_str())?.strip_prefix('/')?
                };
                (!child.is_empty() && !child.contains('/')).then(|| child.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }
}
