//! Error types for the coverage tile services.

use thiserror::Error;

/// Result type alias using CoverageError.
pub type CoverageResult<T> = Result<T, CoverageError>;

/// Primary error type for tile generation.
#[derive(Debug, Error)]
pub enum CoverageError {
    // === Request Errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Data Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Liveness unavailable for antenna {antenna_id}: {message}")]
    LivenessUnavailable { antenna_id: i64, message: String },

    // === Cache Errors ===
    #[error("Cache error: {0}")]
    Cache(String),

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    Render(String),

    // === Infrastructure Errors ===
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl CoverageError {
    /// Shorthand for a malformed request parameter.
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        CoverageError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CoverageError::InvalidParameter { .. } => 400,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for CoverageError {
    fn from(err: std::io::Error) -> Self {
        CoverageError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CoverageError::invalid("z", "not a number").http_status_code(), 400);
        assert_eq!(CoverageError::Database("timeout".into()).http_status_code(), 500);
        assert_eq!(CoverageError::Cache("disk full".into()).http_status_code(), 500);
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = CoverageError::invalid("y", "expected integer, got 'abc'");
        assert_eq!(
            err.to_string(),
            "Invalid parameter value for 'y': expected integer, got 'abc'"
        );
    }
}
