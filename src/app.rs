//! Application assembly: the HTTP router and the collector behind it.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::collector::{Collector, ProcfsProbe};
use crate::config::{Config, DEFAULT_PM2_BINARY};
use crate::events::{AlertKind, EventLog, Severity};
use crate::handlers::{
    alerts_handler, health_handler, logs_handler, metrics_handler, resolve_alert_handler,
};
use crate::middleware::{cors, require_bearer};
use crate::process_manager::{NoProcessManager, Pm2Client, ProcessManager};
use crate::state::SharedState;

/// Builds the API router.
///
/// `/health` is always open; every other route requires the bearer token
/// when a secret is configured.
pub fn build_router(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/logs", get(logs_handler))
        .route("/alerts", get(alerts_handler))
        .route("/alerts/{id}/resolve", post(resolve_alert_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

/// Wires the procfs probe and the configured process manager together.
pub fn build_collector(config: &Config) -> Collector {
    let probe = Arc::new(ProcfsProbe::new(config.proc_root(), config.max_processes));

    let manager: Arc<dyn ProcessManager> = if config.enable_process_manager.unwrap_or(true) {
        let binary = config
            .pm2_binary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PM2_BINARY));
        Arc::new(Pm2Client::new(binary, config.pm2_timeout()))
    } else {
        Arc::new(NoProcessManager)
    };

    Collector::new(probe, manager)
}

/// Seeds the event log with the startup entries the dashboard shows first.
pub fn record_startup(event_log: &EventLog, port: u16) {
    event_log.append_log(Severity::Info, "System", "System API started");
    event_log.append_log(
        Severity::Info,
        "HTTP",
        format!("Server listening on port {}", port),
    );
    event_log.append_alert(AlertKind::Info, "System", "System API initialised");
}
