//! Shared test utilities for the coverage tile server workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory grid cell store with failure injection
//! - Grid cell and timestamp fixtures
//! - Temporary cache directories
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{MemoryStore, fixtures};
//! ```

pub mod fixtures;
pub mod memory_store;

pub use fixtures::*;
pub use memory_store::{AntennaRecord, MemoryStore};

/// Create a temporary directory for a tile cache. Removed when dropped.
pub fn temp_cache_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("tms-cache-")
        .tempdir()
        .expect("Failed to create temp cache dir")
}
