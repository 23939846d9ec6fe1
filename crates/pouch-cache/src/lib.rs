//! Archive handling, project storage and run caches for Pouch
//!
//! This crate provides the storage capability the installer writes through,
//! tarball download and extraction, the persisted per-project run caches and
//! the lock-free membership set shared between workers.

pub mod membership;
pub mod run_cache;
pub mod storage;
pub mod tarball;

// Re-export main types
pub use membership::MembershipSet;
pub use run_cache::{RunCache, ANALYSIS_CACHE_FILE, INSTALL_CACHE_FILE};
pub use storage::{FsStorage, MemoryStorage, Storage};
pub use tarball::{extract_entries, ArchiveFetcher};
