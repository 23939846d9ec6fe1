//! npm tarball handling
//!
//! [`extract_entries`] turns a downloaded `.tgz` into ordered
//! [`ArchiveEntry`](pouch_core::types::ArchiveEntry) values;
//! [`ArchiveFetcher`] adds the download in front of it.

pub mod extract;
pub mod fetch;

// Re-export main functions
pub use extract::extract_entries;
pub use fetch::ArchiveFetcher;
