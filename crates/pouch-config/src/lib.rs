//! Configuration for Pouch installs
//!
//! This crate reads a project's package.json and pouch.toml and layers the
//! install settings with environment and command line overrides.

pub mod toml;
pub mod json;
pub mod merge;

// Re-export main types
pub use toml::{InstallSection, PouchToml, CONFIG_FILE};
pub use json::{PackageJson, MANIFEST_FILE};
pub use merge::{ConfigLayering, ConfigLoader, InstallConfig, ENV_PREFIX};

use pouch_core::error::PouchError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, PouchError>;
