//! Core data types for Pouch.
//!
//! - Version types for semantic versioning and npm ranges
//! - Package requests, resolutions and identities
//! - Extracted archive entries

pub mod archive;
pub mod package;
pub mod version;

// Re-export all public types
pub use archive::{is_binary_path, ArchiveEntry, EntryKind, FileContent, BINARY_EXTENSIONS};
pub use package::{
    Analysis, InstallOutcome, PackageIdentity, PackageRequest, ResolvedPackage, DEFAULT_SKIP_PACKAGES,
};
pub use version::{Comparator, ComparatorSet, Op, PartialVersion, Version, VersionError, VersionReq};
