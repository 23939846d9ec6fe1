//! # pouch-core
//!
//! Core types and utilities shared across all Pouch crates.
//!
//! This crate provides:
//! - `Version` and `VersionReq` with the npm range grammar
//! - Package requests, resolutions and `(name, version, tarball)` identities
//! - `PouchError` for unified error handling
//! - `EventSink` for streaming install progress to a host
//!
//! ## Architecture
//!
//! - `types`: Core data types (Version, PackageRequest, ArchiveEntry, etc.)
//! - `error`: Error types and result aliases
//! - `events`: Progress log events
//! - `utils`: Path helpers for storage-relative paths

pub mod error;
pub mod events;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{PouchError, PouchResult};
pub use events::{EventSink, LogEvent, LogLevel};
pub use types::{
    Analysis, ArchiveEntry, EntryKind, FileContent, InstallOutcome, PackageIdentity,
    PackageRequest, ResolvedPackage, Version, VersionReq,
};
