//! HTTP request handlers.

pub mod health;
pub mod tiles;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use coverage_common::CoverageError;
use tracing::{error, warn};

/// Turn an error into a plain-text response carrying the message.
pub fn error_response(err: &CoverageError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Rejected request");
    }

    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        err.to_string(),
    )
        .into_response()
}
