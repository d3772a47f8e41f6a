//! Snapshot formatting.
//!
//! Turns raw host measurements and process manager descriptors into the JSON
//! document served by `/metrics`. Everything here is pure: the same inputs
//! and `now` always produce the same snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collector::HostSample;
use crate::process::{cmp_by_cpu_desc, ProcessInfo};
use crate::process_manager::ManagedProcess;

/// Bytes in a gigabyte (2^30).
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;
/// Bytes in a megabyte (2^20).
pub const BYTES_PER_MB: f64 = 1_048_576.0;
/// Maximum number of processes included in a snapshot.
pub const TOP_PROCESSES: usize = 10;

/// Host state at one instant, in dashboard units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// CPU load, whole percent in [0, 100].
    pub cpu: u32,
    pub memory: MemorySummary,
    pub disk: DiskSummary,
    pub network: NetworkSummary,
    /// Host uptime in whole seconds.
    pub uptime: u64,
    pub processes: Vec<ProcessSample>,
    pub services: Vec<ServiceSample>,
}

/// Memory in GB, one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub used: f64,
    pub total: f64,
}

/// Primary volume usage in whole GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSummary {
    pub used: u64,
    pub total: u64,
}

/// Primary interface throughput in MB/s, one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub download: f64,
    pub upload: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub name: String,
    /// CPU percent, one decimal place.
    pub cpu: f64,
    /// Resident memory in whole MB.
    pub memory: u64,
    pub status: ProcessStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSample {
    pub name: String,
    pub status: ServiceStatus,
    /// Seconds since the last (re)start.
    pub uptime: u64,
    pub restarts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Memory in whole MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Bytes to GB rounded to one decimal place.
pub fn bytes_to_gb_tenths(bytes: u64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_GB, 1)
}

/// Bytes to whole GB.
pub fn bytes_to_gb_whole(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_GB).round() as u64
}

/// Bytes to whole MB.
pub fn bytes_to_mb_whole(bytes: u64) -> u64 {
    (bytes as f64 / BYTES_PER_MB).round() as u64
}

/// Bytes per second to MB/s rounded to one decimal place.
pub fn rate_to_mb_per_sec(bytes_per_sec: f64) -> f64 {
    round_to(bytes_per_sec.max(0.0) / BYTES_PER_MB, 1)
}

/// Builds the snapshot for one `/metrics` response.
pub fn format_snapshot(
    host: &HostSample,
    managed: &[ManagedProcess],
    now: DateTime<Utc>,
) -> SystemSnapshot {
    let disk = host
        .disk
        .map(|d| DiskSummary {
            used: bytes_to_gb_whole(d.used_bytes),
            total: bytes_to_gb_whole(d.total_bytes),
        })
        .unwrap_or(DiskSummary { used: 0, total: 0 });

    let network = host
        .network
        .as_ref()
        .map(|n| NetworkSummary {
            download: rate_to_mb_per_sec(n.rx_bytes_per_sec),
            upload: rate_to_mb_per_sec(n.tx_bytes_per_sec),
        })
        .unwrap_or(NetworkSummary {
            download: 0.0,
            upload: 0.0,
        });

    let now_ms = now.timestamp_millis();

    SystemSnapshot {
        cpu: host.cpu_percent.clamp(0.0, 100.0).round() as u32,
        memory: MemorySummary {
            used: bytes_to_gb_tenths(host.memory.used_bytes()),
            total: bytes_to_gb_tenths(host.memory.total_bytes),
        },
        disk,
        network,
        uptime: host.uptime_seconds.max(0.0).floor() as u64,
        processes: top_processes(&host.processes, TOP_PROCESSES),
        services: managed.iter().map(|p| format_service(p, now_ms)).collect(),
    }
}

/// The `limit` busiest processes, ordered by CPU descending then PID.
pub fn top_processes(processes: &[ProcessInfo], limit: usize) -> Vec<ProcessSample> {
    let mut sorted: Vec<&ProcessInfo> = processes.iter().collect();
    sorted.sort_by(|a, b| cmp_by_cpu_desc(a, b));

    sorted
        .into_iter()
        .take(limit)
        .map(|p| ProcessSample {
            pid: p.pid,
            name: p.name.clone(),
            cpu: round_to(p.cpu_percent.max(0.0), 1),
            memory: bytes_to_mb_whole(p.rss_bytes),
            status: if p.state == 'R' {
                ProcessStatus::Running
            } else {
                ProcessStatus::Stopped
            },
        })
        .collect()
}

/// Maps a process manager descriptor to a service row.
pub fn format_service(process: &ManagedProcess, now_ms: i64) -> ServiceSample {
    let uptime = process
        .started_at_ms
        .map(|started| (now_ms.saturating_sub(started) / 1000).max(0) as u64)
        .unwrap_or(0);

    ServiceSample {
        name: process.name.clone(),
        status: if process.status == "online" {
            ServiceStatus::Online
        } else {
            ServiceStatus::Stopped
        },
        uptime,
        restarts: process.restart_count.unwrap_or(0),
        port: process.port,
        memory: process.memory_bytes.map(bytes_to_mb_whole),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::VolumeUsage;
    use crate::collectors::NetRate;
    use crate::system::MemoryInfo;
    use chrono::TimeZone;

    fn process(pid: u32, cpu_percent: f64, state: char) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: format!("proc-{pid}"),
            cpu_percent,
            rss_bytes: 10 * 1024 * 1024,
            state,
        }
    }

    fn host_sample() -> HostSample {
        HostSample {
            cpu_percent: 37.6,
            memory: MemoryInfo {
                total_bytes: 8 * 1024 * 1024 * 1024,
                available_bytes: 6 * 1024 * 1024 * 1024,
            },
            disk: Some(VolumeUsage {
                used_bytes: 20 * 1024 * 1024 * 1024 + 600 * 1024 * 1024,
                total_bytes: 100 * 1024 * 1024 * 1024,
            }),
            network: Some(NetRate {
                interface: "eth0".into(),
                rx_bytes_per_sec: 1_572_864.0,
                tx_bytes_per_sec: 104_857.6,
            }),
            uptime_seconds: 3600.9,
            processes: vec![process(1, 0.5, 'S'), process(2, 12.34, 'R')],
        }
    }

    #[test]
    fn test_memory_conversion() {
        assert_eq!(bytes_to_gb_tenths(2_147_483_648), 2.0);
        assert_eq!(bytes_to_gb_tenths(1_610_612_736), 1.5);
        assert_eq!(bytes_to_gb_tenths(0), 0.0);
    }

    #[test]
    fn test_disk_conversion_is_whole() {
        assert_eq!(bytes_to_gb_whole(1_610_612_736), 2);
        assert_eq!(bytes_to_gb_whole(1_073_741_824), 1);
        assert_eq!(bytes_to_gb_whole(500 * 1024 * 1024), 0);
    }

    #[test]
    fn test_rate_conversion() {
        assert_eq!(rate_to_mb_per_sec(1_572_864.0), 1.5);
        assert_eq!(rate_to_mb_per_sec(0.0), 0.0);
        assert_eq!(rate_to_mb_per_sec(-10.0), 0.0);
    }

    #[test]
    fn test_format_snapshot() {
        let now = Utc.timestamp_millis_opt(1_700_000_100_000).unwrap();
        let snapshot = format_snapshot(&host_sample(), &[], now);

        assert_eq!(snapshot.cpu, 38);
        assert_eq!(snapshot.memory.used, 2.0);
        assert_eq!(snapshot.memory.total, 8.0);
        assert_eq!(snapshot.disk, DiskSummary { used: 21, total: 100 });
        assert_eq!(snapshot.network.download, 1.5);
        assert_eq!(snapshot.network.upload, 0.1);
        assert_eq!(snapshot.uptime, 3600);
        assert_eq!(snapshot.processes.len(), 2);
        assert!(snapshot.services.is_empty());
    }

    #[test]
    fn test_format_snapshot_without_disk_or_network() {
        let mut host = host_sample();
        host.disk = None;
        host.network = None;

        let snapshot = format_snapshot(&host, &[], Utc::now());
        assert_eq!(snapshot.disk, DiskSummary { used: 0, total: 0 });
        assert_eq!(snapshot.network.download, 0.0);
        assert_eq!(snapshot.network.upload, 0.0);
    }

    #[test]
    fn test_cpu_is_clamped() {
        let mut host = host_sample();
        host.cpu_percent = 100.4;
        assert_eq!(format_snapshot(&host, &[], Utc::now()).cpu, 100);

        host.cpu_percent = -3.0;
        assert_eq!(format_snapshot(&host, &[], Utc::now()).cpu, 0);
    }

    #[test]
    fn test_top_processes_sorted_and_limited() {
        let procs: Vec<ProcessInfo> = (1..=15)
            .map(|pid| process(pid, (pid % 5) as f64, 'S'))
            .collect();

        let top = top_processes(&procs, TOP_PROCESSES);
        assert_eq!(top.len(), 10);
        // cpu 4.0 for pids 4, 9, 14 come first in pid order
        assert_eq!(
            top.iter().take(3).map(|p| p.pid).collect::<Vec<_>>(),
            vec![4, 9, 14]
        );
        assert!(top.windows(2).all(|w| w[0].cpu >= w[1].cpu));
    }

    #[test]
    fn test_process_fields() {
        let top = top_processes(&[process(7, 3.456, 'R'), process(8, 1.0, 'Z')], 10);
        assert_eq!(top[0].cpu, 3.5);
        assert_eq!(top[0].memory, 10);
        assert_eq!(top[0].status, ProcessStatus::Running);
        assert_eq!(top[1].status, ProcessStatus::Stopped);
    }

    #[test]
    fn test_format_service() {
        let proc = ManagedProcess {
            name: "strapi".into(),
            status: "online".into(),
            started_at_ms: Some(1_700_000_000_000),
            restart_count: Some(2),
            port: Some(1337),
            memory_bytes: Some(150 * 1024 * 1024 + 300_000),
        };

        let service = format_service(&proc, 1_700_000_090_500);
        assert_eq!(service.status, ServiceStatus::Online);
        assert_eq!(service.uptime, 90);
        assert_eq!(service.restarts, 2);
        assert_eq!(service.port, Some(1337));
        assert_eq!(service.memory, Some(150));
    }

    #[test]
    fn test_format_service_defaults_and_clamping() {
        let proc = ManagedProcess {
            name: "worker".into(),
            status: "errored".into(),
            started_at_ms: Some(2_000_000_000_000),
            ..ManagedProcess::default()
        };

        let service = format_service(&proc, 1_000_000_000_000);
        assert_eq!(service.status, ServiceStatus::Stopped);
        assert_eq!(service.uptime, 0);
        assert_eq!(service.restarts, 0);
        assert_eq!(service.port, None);
        assert_eq!(service.memory, None);

        let unknown_start = ManagedProcess {
            name: "cron".into(),
            status: "stopped".into(),
            ..ManagedProcess::default()
        };
        assert_eq!(format_service(&unknown_start, 1_000).uptime, 0);
    }

    #[test]
    fn test_service_json_omits_unknown_fields() {
        let service = format_service(
            &ManagedProcess {
                name: "worker".into(),
                status: "online".into(),
                ..ManagedProcess::default()
            },
            0,
        );
        let json = serde_json::to_value(&service).unwrap();
        assert_eq!(json["status"], "online");
        assert!(json.get("port").is_none());
        assert!(json.get("memory").is_none());
    }
}
