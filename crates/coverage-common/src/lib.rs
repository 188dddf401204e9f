//! Common types and utilities shared across the coverage tile services.

pub mod error;
pub mod sample;
pub mod scope;
pub mod store;
pub mod tile;

pub use error::{CoverageError, CoverageResult};
pub use sample::{classify, BucketCounts, GridCell, Sample, SignalBucket, NO_SIGNAL_BUCKET};
pub use scope::{Scope, TileAddress, TileStyle};
pub use store::{CoverageStore, LastHeardSource};
pub use tile::{circle_buffer, range_at, TileCoord, TileRange, BASE_ZOOM, MIN_CIRCLE_BUFFER};
