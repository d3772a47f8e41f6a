//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that reports the
//! service version and environment. It is served without authentication.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::events::iso_timestamp;
use crate::state::SharedState;

/// Body of a `/health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub environment: String,
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    debug!(
        "Processing /health request (up {:?})",
        state.start_time.elapsed()
    );

    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: iso_timestamp(Utc::now()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment().to_string(),
    })
}
