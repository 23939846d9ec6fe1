//! Pouch benchmarking suite
//!
//! Criterion benchmarks for the membership set, version selection and
//! manifest parsing.

pub mod common;

pub use common::*;
