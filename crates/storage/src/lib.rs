//! Storage layer for the coverage tile server.
//!
//! Provides:
//! - A disk-resident cache of rendered tiles with per-zoom freshness
//! - A time-bounded in-process cache of transceiver liveness
//! - The sample provider that turns stored grid cells into renderable samples
//! - The PostgreSQL store holding aggregated grid cells

pub mod aliases;
pub mod liveness;
pub mod postgres;
pub mod provider;
pub mod tile_cache;

pub use aliases::NetworkAliases;
pub use liveness::{LivenessCache, LivenessCacheStats, LivenessConfig};
pub use postgres::PgCoverageStore;
pub use provider::{SampleProvider, StoreSampleProvider};
pub use tile_cache::{freshness_window, CacheLookup, TileCache, TileCacheConfig};
