//! Tile serving: cache lookup, rendering and cache population.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use bytes::Bytes;
use coverage_common::{CoverageError, CoverageResult, TileAddress, TileStyle};
use renderer::{renderer_for, PaintQueue};
use storage::{SampleProvider, TileCache};
use tracing::{debug, warn};

/// Where a served tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    Cache,
    Rendered,
}

impl TileOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileOrigin::Cache => "cache",
            TileOrigin::Rendered => "rendered",
        }
    }
}

/// An encoded tile ready to be sent.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// PNG bytes.
    pub bytes: Bytes,
    pub origin: TileOrigin,
    /// Modification time of the cache entry the tile was served from or
    /// stored to. `None` when the tile cache was not involved.
    pub cached_at: Option<SystemTime>,
}

/// Produces tiles for tile addresses.
pub struct TileService {
    provider: Arc<dyn SampleProvider>,
    circles_cache: TileCache,
    blocks_cache: TileCache,
    cache_enabled: bool,
}

impl TileService {
    pub fn new(
        provider: Arc<dyn SampleProvider>,
        circles_cache: TileCache,
        blocks_cache: TileCache,
        cache_enabled: bool,
    ) -> Self {
        Self {
            provider,
            circles_cache,
            blocks_cache,
            cache_enabled,
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// Tile cache holding tiles of `style`.
    pub fn cache_for(&self, style: TileStyle) -> &TileCache {
        match style {
            TileStyle::Circles => &self.circles_cache,
            TileStyle::Blocks => &self.blocks_cache,
        }
    }

    /// Serve a tile.
    ///
    /// Network tiles are served from the tile cache when caching is enabled
    /// and a fresh entry exists. Otherwise the tile is rendered and, for
    /// network tiles with caching enabled, stored before it is returned.
    /// A failed store is logged and the rendered tile is still returned.
    pub async fn get_tile(&self, address: &TileAddress) -> CoverageResult<TileResponse> {
        let use_cache = self.cache_enabled && address.is_cacheable();
        let cache = self.cache_for(address.style);

        if use_cache {
            match cache.lookup(address).await {
                Ok(lookup) if lookup.is_servable() => {
                    if let Some(bytes) = lookup.bytes {
                        metrics::counter!("tms_tile_cache_hits_total", "style" => address.style.as_str())
                            .increment(1);
                        return Ok(TileResponse {
                            bytes,
                            origin: TileOrigin::Cache,
                            cached_at: lookup.modified,
                        });
                    }
                }
                Ok(lookup) => {
                    debug!(
                        tile = %address,
                        found = lookup.found,
                        stale = lookup.stale,
                        "Tile cache miss"
                    );
                }
                Err(e) => {
                    warn!(tile = %address, error = %e, "Tile cache lookup failed");
                }
            }
            metrics::counter!("tms_tile_cache_misses_total", "style" => address.style.as_str())
                .increment(1);
        }

        let bytes = self.render(address).await?;

        let cached_at = if use_cache {
            match cache.store(address, bytes.clone()).await {
                Ok(modified) => Some(modified),
                Err(e) => {
                    warn!(tile = %address, error = %e, "Failed to store tile in cache");
                    None
                }
            }
        } else {
            None
        };

        Ok(TileResponse {
            bytes,
            origin: TileOrigin::Rendered,
            cached_at,
        })
    }

    /// Render a tile without touching the tile cache.
    pub async fn render(&self, address: &TileAddress) -> CoverageResult<Bytes> {
        let renderer = renderer_for(address.style);
        let coord = address.coord;
        let range = coord.base_range(renderer.query_buffer(coord.z));

        let samples = self.provider.samples(&address.scope, &range).await?;
        let sample_count = samples.len();

        let start = Instant::now();
        let png = tokio::task::spawn_blocking(move || {
            let queue = PaintQueue::new(samples);
            renderer.render(&coord, &queue)?.encode_png()
        })
        .await
        .map_err(|e| CoverageError::Internal(format!("Render task failed: {}", e)))??;

        let elapsed = start.elapsed();
        metrics::histogram!("tms_render_duration_seconds", "style" => address.style.as_str())
            .record(elapsed.as_secs_f64());
        debug!(
            tile = %address,
            samples = sample_count,
            bytes = png.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered tile"
        );

        Ok(Bytes::from(png))
    }
}
