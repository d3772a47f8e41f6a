//! system-api: host metrics for the operations dashboard.
//!
//! The service samples the host it runs on (CPU, memory, primary disk,
//! primary network interface, uptime, busiest processes) together with the
//! services managed by PM2, and serves the result as JSON. A small bounded
//! log and alert feed rides along for the dashboard's event panels.
//!
//! # Layout
//!
//! - [`collector`]: the [`collector::HostProbe`] and
//!   [`process_manager::ProcessManager`] seams and the [`collector::Collector`]
//!   that joins them
//! - [`snapshot`]: unit conversion into the wire format
//! - [`events`] and [`demo`]: the event log and its demo producers
//! - [`app`], [`handlers`], [`middleware`]: the HTTP surface
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use system_api::app::{build_collector, build_router};
//! use system_api::config::Config;
//! use system_api::events::EventLog;
//! use system_api::state::AppState;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let collector = build_collector(&config);
//! let state = Arc::new(AppState::new(config, collector, Arc::new(EventLog::new())));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3001").await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod collector;
pub mod collectors;
pub mod commands;
pub mod config;
pub mod demo;
pub mod error;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod process;
pub mod process_manager;
pub mod snapshot;
pub mod startup_checks;
pub mod state;
pub mod system;

// Re-export main types for convenience
pub use collector::{Collector, HostProbe, HostSample, ProcfsProbe};
pub use error::{ApiError, CollectError, ProcessManagerError};
pub use events::{AlertKind, AlertRecord, EventLog, LogEntry, Severity};
pub use snapshot::SystemSnapshot;
