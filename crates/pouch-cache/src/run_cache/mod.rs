//! Persisted per-project run caches
//!
//! Two JSON files live in the project root:
//!
//! - `.depCache`: every resolved identity of the last analysis, as
//!   `[name, version, tarball]` triples
//! - `.installCache`: names of the packages already written to storage
//!
//! Both are read when a phase starts and written once it has drained, which
//! lets an interrupted install resume where it stopped. A missing file is an
//! empty cache; an unreadable one is logged and treated the same way.

use std::sync::Arc;

use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::PackageIdentity;
use pouch_core::utils::safe_join;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::Storage;

/// Analysis cache file name
pub const ANALYSIS_CACHE_FILE: &str = ".depCache";

/// Install cache file name
pub const INSTALL_CACHE_FILE: &str = ".installCache";

/// Run caches of one project root
#[derive(Debug, Clone)]
pub struct RunCache {
    storage: Arc<dyn Storage>,
    root: String,
}

impl RunCache {
    pub fn new(storage: Arc<dyn Storage>, root: impl Into<String>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn analysis_path(&self) -> PouchResult<String> {
        safe_join(&self.root, ANALYSIS_CACHE_FILE)
    }

    pub fn install_path(&self) -> PouchResult<String> {
        safe_join(&self.root, INSTALL_CACHE_FILE)
    }

    /// Identities resolved by a previous analysis
    pub async fn load_analysis(&self) -> PouchResult<Vec<PackageIdentity>> {
        self.load(&self.analysis_path()?).await
    }

    pub async fn save_analysis(&self, identities: &[PackageIdentity]) -> PouchResult<()> {
        self.save(&self.analysis_path()?, identities).await
    }

    /// Names installed by previous runs
    pub async fn load_installed(&self) -> PouchResult<Vec<String>> {
        self.load(&self.install_path()?).await
    }

    pub async fn save_installed(&self, names: &[String]) -> PouchResult<()> {
        self.save(&self.install_path()?, names).await
    }

    /// Delete both cache files; missing files are not an error
    pub async fn clear(&self) -> PouchResult<()> {
        for path in [self.analysis_path()?, self.install_path()?] {
            if self.storage.exists(&path).await? {
                self.storage.remove_file(&path).await?;
                tracing::info!("Removed run cache {}", path);
            }
        }
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, path: &str) -> PouchResult<Vec<T>> {
        if !self.storage.exists(path).await? {
            return Ok(Vec::new());
        }

        let raw = self.storage.read_file(path).await?;
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!("Ignoring unreadable run cache {}: {}", path, e);
                Ok(Vec::new())
            },
        }
    }

    async fn save<T: Serialize>(&self, path: &str, items: &[T]) -> PouchResult<()> {
        let json = serde_json::to_vec(items).map_err(|e| PouchError::JsonParse {
            message: format!("failed to encode {}: {}", path, e),
        })?;

        if !self.root.is_empty() && !self.storage.exists(&self.root).await? {
            self.storage.mkdir(&self.root, true).await?;
        }
        self.storage.write_file(path, &json).await?;
        tracing::debug!("Wrote {} entries to {}", items.len(), path);
        Ok(())
    }
}
