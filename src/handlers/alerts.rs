//! Alert endpoint handlers.
//!
//! `/alerts` lists buffered alerts; `/alerts/{id}/resolve` marks one as
//! resolved. Resolving an alert that already is resolved succeeds again.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{debug, info, instrument};

use crate::error::ApiError;
use crate::events::AlertRecord;
use crate::state::SharedState;

/// Handler for the /alerts endpoint. Most recent alerts first.
#[instrument(skip(state))]
pub async fn alerts_handler(State(state): State<SharedState>) -> Json<Vec<AlertRecord>> {
    let alerts = state.event_log.list_alerts();
    debug!("Returning {} alerts", alerts.len());
    Json(alerts)
}

/// Handler for POST /alerts/{id}/resolve.
#[instrument(skip(state))]
pub async fn resolve_alert_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<AlertRecord>, ApiError> {
    match state.event_log.resolve_alert(&id) {
        Some(alert) => {
            info!("Alert {} resolved", alert.id);
            Ok(Json(alert))
        }
        None => Err(ApiError::NotFound(format!("Alert {} not found", id))),
    }
}
