//! npm registry client for Pouch
//!
//! This crate provides HTTP client functionality for fetching package metadata
//! and tarballs from an npm-compatible registry with retry logic and a
//! per-run metadata cache.

pub mod api;
pub mod cache;
pub mod client;

// Re-export main types
pub use api::{DistInfo, PackageMetadataResponse, VersionMetadata};
pub use cache::{CacheEntry, CacheStats, MetadataCache};
pub use client::{encode_package_name, AuthConfig, ClientOptions, RegistryClient, RetryConfig};

use pouch_core::error::PouchError;

/// Default public registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, PouchError>;
