//! Process manager integration.
//!
//! Managed services are listed through PM2's `jlist` command. Each query
//! spawns a short-lived `pm2` child which is killed if the query is dropped
//! or times out, so no connection outlives a single call.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::ProcessManagerError;

/// Default time allowed for one `pm2 jlist` round trip.
pub const DEFAULT_PM2_TIMEOUT: Duration = Duration::from_secs(5);

/// A process as described by the process manager.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManagedProcess {
    pub name: String,
    /// Raw manager status, e.g. `online`, `stopped`, `errored`.
    pub status: String,
    /// Last (re)start time in milliseconds since the Unix epoch.
    pub started_at_ms: Option<i64>,
    pub restart_count: Option<u64>,
    pub port: Option<u16>,
    pub memory_bytes: Option<u64>,
}

/// Source of managed-process descriptors.
#[async_trait]
pub trait ProcessManager: Send + Sync {
    async fn list(&self) -> Result<Vec<ManagedProcess>, ProcessManagerError>;
}

/// Used when the process manager integration is disabled.
pub struct NoProcessManager;

#[async_trait]
impl ProcessManager for NoProcessManager {
    async fn list(&self) -> Result<Vec<ManagedProcess>, ProcessManagerError> {
        Ok(Vec::new())
    }
}

/// Queries PM2 by running `<binary> jlist`.
pub struct Pm2Client {
    binary: PathBuf,
    timeout: Duration,
}

impl Pm2Client {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProcessManager for Pm2Client {
    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    async fn list(&self) -> Result<Vec<ManagedProcess>, ProcessManagerError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("jlist")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ProcessManagerError::Timeout(self.timeout))?
            .map_err(|source| ProcessManagerError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProcessManagerError::ExitStatus {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let processes = parse_jlist(&String::from_utf8_lossy(&output.stdout))?;
        debug!("PM2 reported {} processes", processes.len());
        Ok(processes)
    }
}

#[derive(Deserialize)]
struct Pm2Entry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    pm2_env: Pm2Env,
    #[serde(default)]
    monit: Option<Pm2Monit>,
}

#[derive(Deserialize, Default)]
struct Pm2Env {
    #[serde(default)]
    status: String,
    pm_uptime: Option<i64>,
    restart_time: Option<u64>,
    #[serde(rename = "PORT")]
    port_upper: Option<Value>,
    port: Option<Value>,
}

#[derive(Deserialize)]
struct Pm2Monit {
    memory: Option<u64>,
}

/// Parses `pm2 jlist` output.
///
/// PM2 may print `[PM2] ...` daemon notices before the JSON array, so parsing
/// starts at the first `[` that opens an array of objects (or an empty one).
pub fn parse_jlist(output: &str) -> Result<Vec<ManagedProcess>, ProcessManagerError> {
    let start = output
        .match_indices('[')
        .map(|(i, _)| i)
        .find(|&i| matches!(output[i + 1..].trim_start().chars().next(), Some('{' | ']')))
        .unwrap_or(0);
    let entries: Vec<Pm2Entry> = serde_json::from_str(&output[start..])?;

    Ok(entries
        .into_iter()
        .map(|entry| ManagedProcess {
            port: port_value(entry.pm2_env.port_upper.as_ref())
                .or_else(|| port_value(entry.pm2_env.port.as_ref())),
            name: entry.name,
            status: entry.pm2_env.status,
            started_at_ms: entry.pm2_env.pm_uptime,
            restart_count: entry.pm2_env.restart_time,
            memory_bytes: entry.monit.and_then(|m| m.memory),
        })
        .collect())
}

/// Ports show up as numbers or strings depending on how the env was declared.
fn port_value(value: Option<&Value>) -> Option<u16> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
