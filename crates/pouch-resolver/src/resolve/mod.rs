//! Registry-backed version resolution
//!
//! A request is resolved one of two ways:
//!
//! - dist-tags (`latest`, `next`, ...) and exact versions go straight to the
//!   per-version document `{registry}/{name}/{tag}`
//! - ranges fetch the full package document and select the highest
//!   published version the range accepts

use std::sync::Arc;

use pouch_core::error::{PouchError, PouchResult};
use pouch_core::types::{ResolvedPackage, VersionReq};
use pouch_registry::{MetadataCache, PackageMetadataResponse, RegistryClient};

use crate::semver::VersionSelector;

/// How a range string is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// A dist-tag such as `latest`
    Tag(String),
    /// A single pinned version
    Exact(String),
    /// Anything that needs version selection
    Range(VersionReq),
}

impl RangeSpec {
    /// Classify a manifest range; non-registry specifiers (urls, paths, git)
    /// are rejected
    pub fn parse(range: &str) -> PouchResult<Self> {
        let trimmed = range.trim();
        if trimmed == "latest" {
            return Ok(RangeSpec::Tag(trimmed.to_string()));
        }

        match VersionReq::parse(trimmed) {
            Ok(req) => Ok(match req.exact_version() {
                Some(version) => RangeSpec::Exact(version.to_string()),
                None => RangeSpec::Range(req),
            }),
            Err(e) if is_dist_tag(trimmed) => {
                tracing::trace!("'{}' is not a range ({}), using it as a dist-tag", trimmed, e);
                Ok(RangeSpec::Tag(trimmed.to_string()))
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn is_dist_tag(input: &str) -> bool {
    input
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic())
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Resolves `(name, range)` to one published version
#[derive(Debug, Clone)]
pub struct VersionResolver {
    client: Arc<RegistryClient>,
    metadata_cache: Arc<MetadataCache>,
}

impl VersionResolver {
    pub fn new(client: Arc<RegistryClient>, metadata_cache: Arc<MetadataCache>) -> Self {
        Self {
            client,
            metadata_cache,
        }
    }

    pub fn client(&self) -> &Arc<RegistryClient> {
        &self.client
    }

    /// Resolve `name@range` to a concrete version and its declared
    /// dependencies
    pub async fn resolve(&self, name: &str, range: &str) -> PouchResult<ResolvedPackage> {
        match RangeSpec::parse(range)? {
            RangeSpec::Tag(tag) => self.resolve_direct(name, &tag).await,
            RangeSpec::Exact(version) => self.resolve_direct(name, &version).await,
            RangeSpec::Range(req) => self.resolve_range(name, range, &req).await,
        }
    }

    async fn resolve_direct(&self, name: &str, tag: &str) -> PouchResult<ResolvedPackage> {
        let document = self.client.fetch_version(name, tag).await?;
        let resolved = document.into_resolved(name);
        tracing::debug!("Resolved {}@{} -> {}", name, tag, resolved.version);
        Ok(resolved)
    }

    async fn resolve_range(
        &self,
        name: &str,
        range: &str,
        req: &VersionReq,
    ) -> PouchResult<ResolvedPackage> {
        let document = self.packument(name).await?;
        let selector = VersionSelector::from_published(document.version_keys());

        let unsatisfiable = || PouchError::UnsatisfiableRange {
            package: name.to_string(),
            range: range.to_string(),
        };

        let best = selector.select_best(req).ok_or_else(unsatisfiable)?;
        let key = selector.published_key(best).ok_or_else(unsatisfiable)?;
        let metadata = document.version(key).cloned().ok_or_else(unsatisfiable)?;

        let resolved = metadata.into_resolved(name);
        tracing::debug!("Resolved {}@{} -> {}", name, range, resolved.version);
        Ok(resolved)
    }

    async fn packument(&self, name: &str) -> PouchResult<Arc<PackageMetadataResponse>> {
        if let Some(cached) = self.metadata_cache.get(name) {
            return Ok(cached);
        }
        let document = self.client.fetch_packument(name).await?;
        Ok(self.metadata_cache.insert(name, document))
    }
}

#[cfg(test)]
mod tests;
