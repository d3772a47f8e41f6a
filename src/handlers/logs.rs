//! Log feed endpoint handler.

use axum::{extract::State, Json};
use tracing::{debug, instrument};

use crate::events::LogEntry;
use crate::state::SharedState;

/// Handler for the /logs endpoint. Most recent entries first.
#[instrument(skip(state))]
pub async fn logs_handler(State(state): State<SharedState>) -> Json<Vec<LogEntry>> {
    let logs = state.event_log.list_logs();
    debug!("Returning {} log entries", logs.len());
    Json(logs)
}
