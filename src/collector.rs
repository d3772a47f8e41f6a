//! Snapshot collection.
//!
//! A `Collector` pairs a [`HostProbe`] (CPU, memory, disk, network, uptime and
//! the process table) with a [`ProcessManager`]. Host introspection failing
//! fails the whole collection; the process manager failing only empties the
//! service list.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::collectors::{primary_filesystem, read_filesystem_stats, NetRate, NetRateCache};
use crate::error::CollectError;
use crate::process::{scan_processes, ProcessCpuTracker, ProcessInfo};
use crate::process_manager::{ManagedProcess, ProcessManager};
use crate::snapshot::{format_snapshot, SystemSnapshot};
use crate::system::{read_memory_info, read_uptime, CpuStatsCache, MemoryInfo};

/// Used and total size of the primary volume, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Raw host measurements, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSample {
    pub cpu_percent: f64,
    pub memory: MemoryInfo,
    /// `None` when no real filesystem is mounted.
    pub disk: Option<VolumeUsage>,
    /// `None` when the host has no usable network interface.
    pub network: Option<NetRate>,
    pub uptime_seconds: f64,
    pub processes: Vec<ProcessInfo>,
}

/// Reads the host's current state. Implementations block on I/O.
pub trait HostProbe: Send + Sync {
    fn probe(&self) -> Result<HostSample, CollectError>;
}

/// [`HostProbe`] backed by a procfs mount.
///
/// Holds the previous CPU, network and per-process counters so that loads
/// and rates are measured between consecutive probes.
pub struct ProcfsProbe {
    root: PathBuf,
    max_processes: Option<usize>,
    cpu: CpuStatsCache,
    network: NetRateCache,
    tracker: ProcessCpuTracker,
}

impl ProcfsProbe {
    pub fn new(root: impl Into<PathBuf>, max_processes: Option<usize>) -> Self {
        Self {
            root: root.into(),
            max_processes,
            cpu: CpuStatsCache::new(),
            network: NetRateCache::new(),
            tracker: ProcessCpuTracker::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl HostProbe for ProcfsProbe {
    fn probe(&self) -> Result<HostSample, CollectError> {
        let cpu_percent = self.cpu.current_load(&self.root)?;
        let memory = read_memory_info(&self.root)?;
        let uptime_seconds = read_uptime(&self.root)?;

        let filesystems = read_filesystem_stats(&self.root)?;
        let disk = primary_filesystem(&filesystems).map(|fs| VolumeUsage {
            used_bytes: fs.used_bytes,
            total_bytes: fs.size_bytes,
        });

        let network = self.network.sample(&self.root)?;
        let processes = scan_processes(&self.root, self.max_processes, &self.tracker);

        Ok(HostSample {
            cpu_percent,
            memory,
            disk,
            network,
            uptime_seconds,
            processes,
        })
    }
}

/// Produces [`SystemSnapshot`]s on demand.
#[derive(Clone)]
pub struct Collector {
    host: Arc<dyn HostProbe>,
    manager: Arc<dyn ProcessManager>,
}

impl Collector {
    pub fn new(host: Arc<dyn HostProbe>, manager: Arc<dyn ProcessManager>) -> Self {
        Self { host, manager }
    }

    /// Samples the host and the process manager concurrently.
    ///
    /// A host failure returns immediately and drops the pending process
    /// manager call.
    #[instrument(skip(self))]
    pub async fn sample(&self) -> Result<SystemSnapshot, CollectError> {
        let host = Arc::clone(&self.host);
        let probe = async move {
            tokio::task::spawn_blocking(move || host.probe())
                .await
                .map_err(|e| CollectError::Join(e.to_string()))?
        };
        let services = async { Ok::<_, CollectError>(self.list_services().await) };

        let (sample, services) = tokio::try_join!(probe, services)?;

        debug!(
            "Collected {} processes and {} services",
            sample.processes.len(),
            services.len()
        );
        Ok(format_snapshot(&sample, &services, Utc::now()))
    }

    async fn list_services(&self) -> Vec<ManagedProcess> {
        match self.manager.list().await {
            Ok(processes) => processes,
            Err(e) => {
                warn!("Process manager unavailable: {}", e);
                Vec::new()
            }
        }
    }
}
