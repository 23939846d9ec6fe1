//! Version resolution and package installation for Pouch
//!
//! This crate turns `(name, range)` requests into pinned packages against an
//! npm registry and installs them onto project storage. The resolved graph
//! view reports dependency cycles once analysis has finished.

pub mod graph;
pub mod manager;
pub mod resolve;
pub mod semver;

// Re-export main types
pub use graph::ResolvedGraph;
pub use manager::{PackageManager, NODE_MODULES};
pub use pouch_core::types::DEFAULT_SKIP_PACKAGES;
pub use resolve::{RangeSpec, VersionResolver};
pub use semver::VersionSelector;
