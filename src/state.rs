//! Application state management for the API.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background demo feed.

use std::sync::Arc;
use std::time::Instant;

use crate::collector::Collector;
use crate::config::Config;
use crate::events::EventLog;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// State shared across requests and background tasks.
pub struct AppState {
    pub config: Arc<Config>,
    pub collector: Collector,
    pub event_log: Arc<EventLog>,
    /// Bearer secret; `None` disables authentication.
    pub api_secret: Option<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, collector: Collector, event_log: Arc<EventLog>) -> Self {
        let api_secret = config.api_secret().map(str::to_string);
        Self {
            config: Arc::new(config),
            collector,
            event_log,
            api_secret,
            start_time: Instant::now(),
        }
    }

    pub fn environment(&self) -> &str {
        self.config.environment()
    }
}
