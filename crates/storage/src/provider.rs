//! Turns stored grid cells into renderable samples.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use coverage_common::{BucketCounts, CoverageResult, CoverageStore, GridCell, Sample, Scope, TileRange};
use tracing::{debug, warn};

use crate::aliases::NetworkAliases;
use crate::liveness::LivenessCache;

/// Source of classified samples for a base-zoom range.
///
/// Query failures are returned as errors, never as an empty result.
#[async_trait]
pub trait SampleProvider: Send + Sync {
    /// One sample per cell, summed over the live transceivers of a network.
    async fn network_samples(&self, network_id: &str, range: &TileRange) -> CoverageResult<Vec<Sample>>;

    /// One sample per cell, summed over every transceiver of one gateway.
    async fn gateway_samples(
        &self,
        network_id: &str,
        gateway_id: &str,
        range: &TileRange,
    ) -> CoverageResult<Vec<Sample>>;

    async fn samples(&self, scope: &Scope, range: &TileRange) -> CoverageResult<Vec<Sample>> {
        match scope {
            Scope::Network { network_id } => self.network_samples(network_id, range).await,
            Scope::Gateway {
                network_id,
                gateway_id,
            } => self.gateway_samples(network_id, gateway_id, range).await,
        }
    }
}

/// [`SampleProvider`] backed by a [`CoverageStore`] and a liveness cache.
pub struct StoreSampleProvider {
    store: Arc<dyn CoverageStore>,
    liveness: Arc<LivenessCache>,
    aliases: NetworkAliases,
}

impl StoreSampleProvider {
    pub fn new(store: Arc<dyn CoverageStore>, liveness: Arc<LivenessCache>, aliases: NetworkAliases) -> Self {
        Self {
            store,
            liveness,
            aliases,
        }
    }

    pub fn liveness(&self) -> &Arc<LivenessCache> {
        &self.liveness
    }
}

#[async_trait]
impl SampleProvider for StoreSampleProvider {
    async fn network_samples(&self, network_id: &str, range: &TileRange) -> CoverageResult<Vec<Sample>> {
        let start = Instant::now();
        let network_ids = self.aliases.expand(network_id);
        let cells = self.store.network_cells(&network_ids, range).await?;
        metrics::histogram!("tms_select_network_duration_seconds").record(start.elapsed().as_secs_f64());

        let rows = cells.len();
        let mut liveness: HashMap<i64, bool> = HashMap::new();
        let mut merged: BTreeMap<(i64, i64), BucketCounts> = BTreeMap::new();
        let mut unavailable = 0usize;

        for cell in cells {
            let Some(antenna_id) = cell.antenna_id else {
                continue;
            };

            let live = match liveness.get(&antenna_id) {
                Some(live) => *live,
                None => {
                    let live = match self.liveness.is_live(antenna_id).await {
                        Ok(live) => live,
                        Err(e) => {
                            // Excluded for this request only; nothing is cached.
                            warn!(antenna_id, error = %e, "Excluding cells with unknown liveness");
                            unavailable += 1;
                            false
                        }
                    };
                    liveness.insert(antenna_id, live);
                    live
                }
            };

            if live {
                merged
                    .entry((cell.x, cell.y))
                    .or_default()
                    .merge(&cell.counts);
            }
        }

        if unavailable > 0 {
            metrics::counter!("tms_liveness_unavailable_total").increment(unavailable as u64);
        }

        let samples: Vec<Sample> = merged
            .into_iter()
            .map(|((x, y), counts)| GridCell::new(None, x, y, counts).to_sample())
            .collect();

        debug!(
            network_id = %network_id,
            rows,
            antennas = liveness.len(),
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded network samples"
        );

        Ok(samples)
    }

    async fn gateway_samples(
        &self,
        network_id: &str,
        gateway_id: &str,
        range: &TileRange,
    ) -> CoverageResult<Vec<Sample>> {
        let start = Instant::now();
        let network_ids = self.aliases.expand(network_id);
        let cells = self.store.gateway_cells(&network_ids, gateway_id, range).await?;
        metrics::histogram!("tms_select_gateway_duration_seconds").record(start.elapsed().as_secs_f64());

        let samples: Vec<Sample> = cells.iter().map(GridCell::to_sample).collect();

        debug!(
            network_id = %network_id,
            gateway_id = %gateway_id,
            samples = samples.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded gateway samples"
        );

        Ok(samples)
    }
}
