//! Error types shared across the collector.
//!
//! Introspection failures (`CollectError`) are fatal for the request that hit
//! them, process manager failures (`ProcessManagerError`) are recovered by the
//! collector, and `ApiError` is what the HTTP layer turns into a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

/// Failure while reading host state from procfs or the filesystem layer.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("host probe task failed: {0}")]
    Join(String),
}

impl CollectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CollectError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure while querying the process manager.
#[derive(Debug, thiserror::Error)]
pub enum ProcessManagerError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("process manager did not answer within {0:?}")]
    Timeout(Duration),

    #[error("process manager exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("invalid process list: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors surfaced to HTTP clients.
///
/// The body is always `{"error": "..."}`; internal details stay in the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication token required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to collect system metrics")]
    Collection(#[from] CollectError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Collection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
