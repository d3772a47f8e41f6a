//! HTTP endpoint handlers for the API.
//!
//! This module provides handlers for all HTTP endpoints:
//! - `/metrics`: Current host snapshot as JSON
//! - `/logs`: Buffered log entries
//! - `/alerts`: Buffered alerts, plus `/alerts/{id}/resolve`
//! - `/health`: Liveness check, never authenticated

pub mod alerts;
pub mod health;
pub mod logs;
pub mod metrics;

// Re-export handlers
pub use alerts::{alerts_handler, resolve_alert_handler};
pub use health::health_handler;
pub use logs::logs_handler;
pub use metrics::metrics_handler;
