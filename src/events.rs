//! In-memory event log.
//!
//! Two bounded buffers, most recent first: log lines and alert records. Both
//! are fed by the service itself and by the demo feed, and read by the
//! `/logs` and `/alerts` handlers.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Default number of log entries kept.
pub const DEFAULT_LOG_CAPACITY: usize = 100;
/// Default number of alerts kept.
pub const DEFAULT_ALERT_CAPACITY: usize = 20;

/// Value of `source` for every entry this service produces.
pub const LOG_SOURCE: &str = "system";

const ALERT_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Debug,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Debug,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Critical,
    Warning,
    Info,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [AlertKind::Critical, AlertKind::Warning, AlertKind::Info];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: Severity,
    pub service: String,
    pub message: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub service: String,
    pub message: String,
    pub timestamp: String,
    pub resolved: bool,
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds an alert id of the form `alert-<epoch-ms>-<9 base36 chars>`.
pub fn generate_alert_id(at: DateTime<Utc>, rng: &mut impl Rng) -> String {
    let suffix: String = (0..ALERT_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("alert-{}-{}", at.timestamp_millis(), suffix)
}

/// Bounded, most-recent-first log and alert buffers.
pub struct EventLog {
    logs: Mutex<VecDeque<LogEntry>>,
    alerts: Mutex<VecDeque<AlertRecord>>,
    log_capacity: usize,
    alert_capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

// A panic while holding a buffer lock cannot leave it half-updated
// (push + truncate), so poisoned locks are simply reused.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY, DEFAULT_ALERT_CAPACITY)
    }

    /// Capacities below one are raised to one.
    pub fn with_capacity(log_capacity: usize, alert_capacity: usize) -> Self {
        let log_capacity = log_capacity.max(1);
        let alert_capacity = alert_capacity.max(1);
        Self {
            logs: Mutex::new(VecDeque::with_capacity(log_capacity + 1)),
            alerts: Mutex::new(VecDeque::with_capacity(alert_capacity + 1)),
            log_capacity,
            alert_capacity,
        }
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    pub fn alert_capacity(&self) -> usize {
        self.alert_capacity
    }

    /// Appends a log line at the front, dropping the oldest beyond capacity.
    pub fn append_log(
        &self,
        level: Severity,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> LogEntry {
        let entry = LogEntry {
            timestamp: iso_timestamp(Utc::now()),
            level,
            service: service.into(),
            message: message.into(),
            source: LOG_SOURCE.to_string(),
        };

        let mut logs = lock(&self.logs);
        logs.push_front(entry.clone());
        logs.truncate(self.log_capacity);
        entry
    }

    /// Appends an unresolved alert at the front, dropping the oldest beyond
    /// capacity.
    pub fn append_alert(
        &self,
        kind: AlertKind,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> AlertRecord {
        let now = Utc::now();
        let record = AlertRecord {
            id: generate_alert_id(now, &mut rand::thread_rng()),
            kind,
            service: service.into(),
            message: message.into(),
            timestamp: iso_timestamp(now),
            resolved: false,
        };

        let mut alerts = lock(&self.alerts);
        alerts.push_front(record.clone());
        alerts.truncate(self.alert_capacity);
        record
    }

    /// Current log lines, most recent first.
    pub fn list_logs(&self) -> Vec<LogEntry> {
        lock(&self.logs).iter().cloned().collect()
    }

    /// Current alerts, most recent first.
    pub fn list_alerts(&self) -> Vec<AlertRecord> {
        lock(&self.alerts).iter().cloned().collect()
    }

    /// Marks an alert resolved. Returns `None` when no buffered alert has `id`.
    pub fn resolve_alert(&self, id: &str) -> Option<AlertRecord> {
        let mut alerts = lock(&self.alerts);
        let alert = alerts.iter_mut().find(|a| a.id == id)?;
        alert.resolved = true;
        Some(alert.clone())
    }
}
