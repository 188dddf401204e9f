//! Tile endpoint handlers.
//!
//! Path parameters are taken raw and percent-decoded after route matching,
//! so network identifiers such as `NS_TTS_V3://ttn@000013` can be sent
//! encoded as a single segment.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::{
    extract::{Extension, RawPathParams},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use coverage_common::{CoverageError, CoverageResult, Scope, TileAddress, TileCoord, TileStyle};
use tracing::debug;

use super::error_response;
use crate::state::AppState;
use crate::tiles::{TileOrigin, TileResponse};

/// Freshness advertised to clients for cache-backed tiles.
pub const CLIENT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// GET /circles/network/:network_id/:z/:x/:y
pub async fn circles_network_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: RawPathParams,
) -> Response {
    serve(&state, network_address(TileStyle::Circles, &params)).await
}

/// GET /blocks/network/:network_id/:z/:x/:y
pub async fn blocks_network_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: RawPathParams,
) -> Response {
    serve(&state, network_address(TileStyle::Blocks, &params)).await
}

/// GET /circles/gateway/:network_id/:gateway_id/:z/:x/:y
pub async fn circles_gateway_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: RawPathParams,
) -> Response {
    serve(&state, gateway_address(TileStyle::Circles, &params)).await
}

/// GET /blocks/gateway/:network_id/:gateway_id/:z/:x/:y
pub async fn blocks_gateway_handler(
    Extension(state): Extension<Arc<AppState>>,
    params: RawPathParams,
) -> Response {
    serve(&state, gateway_address(TileStyle::Blocks, &params)).await
}

async fn serve(state: &AppState, address: CoverageResult<TileAddress>) -> Response {
    let address = match address {
        Ok(address) => address,
        Err(e) => return error_response(&e),
    };

    match state.tiles.get_tile(&address).await {
        Ok(tile) => {
            debug!(tile = %address, origin = tile.origin.as_str(), "Serving tile");
            tile_response(tile)
        }
        Err(e) => error_response(&e),
    }
}

fn tile_response(tile: TileResponse) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(
        "x-cache",
        HeaderValue::from_static(match tile.origin {
            TileOrigin::Cache => "HIT",
            TileOrigin::Rendered => "MISS",
        }),
    );

    if let Some(modified) = tile.cached_at {
        let cache_control = format!("public, max-age={}", CLIENT_MAX_AGE.as_secs());
        let expires = http_date(SystemTime::now() + CLIENT_MAX_AGE);
        let last_modified = http_date(modified);

        for (name, value) in [
            (header::CACHE_CONTROL, cache_control),
            (header::EXPIRES, expires),
            (header::LAST_MODIFIED, last_modified),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
    }

    (StatusCode::OK, headers, tile.bytes).into_response()
}

/// Format a timestamp as an RFC 7231 HTTP date.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn network_address(style: TileStyle, params: &RawPathParams) -> CoverageResult<TileAddress> {
    let network_id = decoded(params, "network_id")?;
    let coord = tile_coord(params)?;
    Ok(TileAddress::new(style, Scope::network(network_id), coord))
}

fn gateway_address(style: TileStyle, params: &RawPathParams) -> CoverageResult<TileAddress> {
    let network_id = decoded(params, "network_id")?;
    let gateway_id = decoded(params, "gateway_id")?;
    let coord = tile_coord(params)?;
    Ok(TileAddress::new(
        style,
        Scope::gateway(network_id, gateway_id),
        coord,
    ))
}

fn tile_coord(params: &RawPathParams) -> CoverageResult<TileCoord> {
    let z = integer("z", raw(params, "z")?)?;
    let x = integer("x", raw(params, "x")?)?;
    let y_raw = raw(params, "y")?;
    let y = integer("y", y_raw.strip_suffix(".png").unwrap_or(y_raw))?;
    TileCoord::new(z, x, y)
}

fn integer(name: &str, value: &str) -> CoverageResult<u32> {
    value
        .parse()
        .map_err(|_| CoverageError::invalid(name, format!("expected a non-negative integer, got '{}'", value)))
}

fn raw<'a>(params: &'a RawPathParams, name: &str) -> CoverageResult<&'a str> {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .ok_or_else(|| CoverageError::invalid(name, "missing path parameter"))
}

fn decoded(params: &RawPathParams, name: &str) -> CoverageResult<String> {
    let value = raw(params, name)?;
    urlencoding::decode(value)
        .map(Cow::into_owned)
        .map_err(|e| CoverageError::invalid(name, format!("invalid percent-encoding: {}", e)))
}
