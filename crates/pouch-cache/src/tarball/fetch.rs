//! Download-then-extract for package archives

use std::sync::Arc;

use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::ArchiveEntry;
use pouch_registry::RegistryClient;

use super::extract::extract_entries;

/// Fetches a package archive and unpacks it in memory
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    client: Arc<RegistryClient>,
}

impl ArchiveFetcher {
    pub fn new(client: Arc<RegistryClient>) -> Self {
        Self { client }
    }

    /// Download the whole archive at `url` and return its entries with the
    /// root folder stripped
    pub async fn fetch_and_extract(&self, url: &str) -> PouchResult<Vec<ArchiveEntry>> {
        let compressed = self.client.download_tarball(url).await?;
        tracing::debug!("Downloaded {} ({} bytes)", url, compressed.len());

        // Decompression is CPU bound; keep it off the async workers
        let entries = tokio::task::spawn_blocking(move || extract_entries(&compressed))
            .await
            .map_err(|e| PouchError::ExtractError {
                message: format!("extraction task failed: {}", e),
                source: None,
            })??;

        tracing::debug!("Extracted {} entries from {}", entries.len(), url);
        Ok(entries)
    }
}
