//! Metadata caching with TTL support
//!
//! A package document is fetched at most once per run for as long as its
//! entry stays fresh; version selection for repeated ranges hits the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::api::PackageMetadataResponse;

/// Default time-to-live for cached documents
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached document, shared with every reader
    pub metadata: Arc<PackageMetadataResponse>,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(metadata: PackageMetadataResponse) -> Self {
        Self::with_ttl(metadata, DEFAULT_TTL)
    }

    pub fn with_ttl(metadata: PackageMetadataResponse, ttl: Duration) -> Self {
        Self {
            metadata: Arc::new(metadata),
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }
}

/// In-memory metadata cache with TTL
#[derive(Debug)]
pub struct MetadataCache {
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Get cached metadata if fresh; stale entries are evicted
    pub fn get(&self, package_name: &str) -> Option<Arc<PackageMetadataResponse>> {
        let fresh = self.cache.get(package_name).and_then(|entry| {
            entry
                .is_fresh()
                .then(|| Arc::clone(&entry.metadata))
        });

        if fresh.is_none() {
            // The read guard above is released before touching the shard again
            self.cache
                .remove_if(package_name, |_, entry| !entry.is_fresh());
        }
        fresh
    }

    /// Store metadata with the cache's TTL and return the shared handle
    pub fn insert(
        &self,
        package_name: &str,
        metadata: PackageMetadataResponse,
    ) -> Arc<PackageMetadataResponse> {
        let entry = CacheEntry::with_ttl(metadata, self.ttl);
        let shared = Arc::clone(&entry.metadata);
        self.cache.insert(package_name.to_string(), entry);
        shared
    }

    pub fn contains_fresh(&self, package_name: &str) -> bool {
        self.cache
            .get(package_name)
            .map(|entry| entry.is_fresh())
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        let mut fresh_entries = 0;
        let mut stale_entries = 0;

        for entry in self.cache.iter() {
            if entry.is_fresh() {
                fresh_entries += 1;
            } else {
                stale_entries += 1;
            }
        }

        CacheStats {
            total_entries: fresh_entries + stale_entries,
            fresh_entries,
            stale_entries,
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove stale entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh());
        before.saturating_sub(self.cache.len())
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}
