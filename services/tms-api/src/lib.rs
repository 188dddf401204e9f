//! Coverage Tile Server Library
//!
//! HTTP service rendering radio coverage tiles from aggregated grid cells,
//! with a disk tile cache in front of the renderer.

pub mod config;
pub mod handlers;
pub mod maintenance;
pub mod metrics;
pub mod state;
pub mod tiles;

use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the service router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health::index_handler))
        // Network tiles
        .route(
            "/circles/network/:network_id/:z/:x/:y",
            get(handlers::tiles::circles_network_handler),
        )
        .route(
            "/blocks/network/:network_id/:z/:x/:y",
            get(handlers::tiles::blocks_network_handler),
        )
        // Gateway tiles
        .route(
            "/circles/gateway/:network_id/:gateway_id/:z/:x/:y",
            get(handlers::tiles::circles_gateway_handler),
        )
        .route(
            "/blocks/gateway/:network_id/:gateway_id/:z/:x/:y",
            get(handlers::tiles::blocks_gateway_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .route_layer(middleware::from_fn(metrics::track_request_duration))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
