//! Interfaces to the persistent store holding aggregated grid cells.
//!
//! The store itself is owned by other services; tile generation only reads
//! from it. Implementations must report query failures as errors rather
//! than as empty results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoverageResult;
use crate::sample::GridCell;
use crate::tile::TileRange;

/// Source of aggregated grid cells.
#[async_trait]
pub trait CoverageStore: Send + Sync {
    /// Cells of every transceiver in `network_ids`, one row per
    /// `(antenna_id, x, y)` with `antenna_id` set, restricted to `range`.
    async fn network_cells(
        &self,
        network_ids: &[String],
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>>;

    /// Cells of one gateway's transceivers, already summed per `(x, y)`.
    async fn gateway_cells(
        &self,
        network_ids: &[String],
        gateway_id: &str,
        range: &TileRange,
    ) -> CoverageResult<Vec<GridCell>>;
}

/// Point lookup of when a transceiver's gateway was last heard.
#[async_trait]
pub trait LastHeardSource: Send + Sync {
    /// `Ok(None)` when the transceiver or its gateway is unknown.
    async fn antenna_last_heard(&self, antenna_id: i64) -> CoverageResult<Option<DateTime<Utc>>>;
}
