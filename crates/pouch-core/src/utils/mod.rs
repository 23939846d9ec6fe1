//! Utility functions and helpers.
//!
//! Common functionality used across multiple Pouch crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{is_safe_path, normalize_path, parent_dir, safe_join, strip_root_segment};
