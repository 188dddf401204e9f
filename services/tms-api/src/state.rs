//! Application state for the tile server.

use std::sync::Arc;

use anyhow::{Context, Result};
use coverage_common::{CoverageStore, LastHeardSource};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::{LivenessCache, PgCoverageStore, StoreSampleProvider, TileCache};
use tracing::info;

use crate::config::ServiceConfig;
use crate::tiles::TileService;

/// Shared application state.
pub struct AppState {
    pub config: ServiceConfig,

    /// Cache-aware tile generation.
    pub tiles: TileService,

    /// Transceiver liveness, shared with the sample provider.
    pub liveness: Arc<LivenessCache>,

    /// Database handle used for readiness checks. `None` when the state was
    /// built over another store.
    pub database: Option<PgCoverageStore>,

    /// Renders the `/metrics` body. `None` when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Connect to PostgreSQL and build the state over it.
    pub async fn connect(config: ServiceConfig, prometheus: Option<PrometheusHandle>) -> Result<Self> {
        let database = PgCoverageStore::connect(
            &config.postgres.database_url(),
            config.postgres.max_connections,
        )
        .await
        .context("Failed to connect to PostgreSQL")?;

        info!(
            host = %config.postgres.host,
            database = %config.postgres.database,
            "Connected to PostgreSQL"
        );

        let store = Arc::new(database.clone());
        let mut state = Self::with_store(config, store.clone(), store)?;
        state.database = Some(database);
        state.prometheus = prometheus;
        Ok(state)
    }

    /// Build the state over any store implementation.
    ///
    /// Creates the tile cache directories when caching is enabled.
    pub fn with_store(
        config: ServiceConfig,
        store: Arc<dyn CoverageStore>,
        last_heard: Arc<dyn LastHeardSource>,
    ) -> Result<Self> {
        let liveness = Arc::new(LivenessCache::new(last_heard, config.liveness));
        let provider = Arc::new(StoreSampleProvider::new(
            store,
            liveness.clone(),
            config.aliases.clone(),
        ));

        let cache_config = config.cache.tile_cache_config();
        let circles_cache = TileCache::new(config.cache.circles_dir.clone(), cache_config);
        let blocks_cache = TileCache::new(config.cache.blocks_dir.clone(), cache_config);

        if config.cache.enabled {
            circles_cache
                .ensure_root()
                .context("Failed to prepare circles tile cache")?;
            blocks_cache
                .ensure_root()
                .context("Failed to prepare blocks tile cache")?;
        }

        let tiles = TileService::new(provider, circles_cache, blocks_cache, config.cache.enabled);

        Ok(Self {
            config,
            tiles,
            liveness,
            database: None,
            prometheus: None,
        })
    }
}
