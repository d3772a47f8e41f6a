//! Metrics endpoint handler.
//!
//! This module provides the `/metrics` endpoint handler. Every request takes
//! a fresh snapshot; there is no cache between requests. The outcome is also
//! recorded in the event log so the dashboard's log panel shows API activity.

use axum::{extract::State, Json};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::error::ApiError;
use crate::events::Severity;
use crate::snapshot::SystemSnapshot;
use crate::state::SharedState;

/// Service name used for log entries written by the HTTP layer.
pub const API_LOG_SERVICE: &str = "API";

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(
    State(state): State<SharedState>,
) -> Result<Json<SystemSnapshot>, ApiError> {
    let start = Instant::now();

    match state.collector.sample().await {
        Ok(snapshot) => {
            state
                .event_log
                .append_log(Severity::Info, API_LOG_SERVICE, "System metrics collected");
            debug!(
                "Snapshot with {} processes and {} services in {:?}",
                snapshot.processes.len(),
                snapshot.services.len(),
                start.elapsed()
            );
            Ok(Json(snapshot))
        }
        Err(e) => {
            error!("Metrics collection failed: {}", e);
            state.event_log.append_log(
                Severity::Error,
                API_LOG_SERVICE,
                format!("Metrics collection failed: {}", e),
            );
            Err(ApiError::Collection(e))
        }
    }
}
