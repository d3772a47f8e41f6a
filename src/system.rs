//! System-wide metrics collection from the /proc filesystem.
//!
//! This module provides functions to read aggregate CPU time, memory totals
//! and uptime. Every reader takes the procfs root so tests can point it at a
//! fixture directory.

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use crate::error::CollectError;
use crate::process::parse_kb_value;

/// Memory totals from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryInfo {
    /// Memory in use, i.e. everything the kernel cannot hand out right now.
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.available_bytes)
    }
}

/// Aggregate CPU time counters from the `cpu` line of /proc/stat (in ticks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    /// Calculate non-active time (idle + iowait).
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    /// Busy share between two samples as a percentage in [0, 100].
    ///
    /// Returns `None` when no ticks elapsed between the samples.
    pub fn busy_percent_since(&self, previous: &CpuStat) -> Option<f64> {
        let delta_total = self.total().saturating_sub(previous.total());
        if delta_total == 0 {
            return None;
        }
        let delta_idle = self.idle_total().saturating_sub(previous.idle_total());
        let busy = delta_total.saturating_sub(delta_idle);
        Some(busy as f64 / delta_total as f64 * 100.0)
    }
}

/// Reads the aggregate `cpu` line from /proc/stat.
pub fn read_cpu_stat(root: &Path) -> Result<CpuStat, CollectError> {
    let path = root.join("stat");
    let content = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;

    content
        .lines()
        .find_map(parse_cpu_line)
        .ok_or_else(|| CollectError::parse(&path, "no aggregate cpu line"))
}

/// Parses `cpu  user nice system idle iowait irq softirq [steal ...]`.
fn parse_cpu_line(line: &str) -> Option<CpuStat> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"cpu") || parts.len() < 8 {
        return None;
    }

    let field = |i: usize| -> u64 { parts.get(i).and_then(|v| v.parse().ok()).unwrap_or(0) };

    Some(CpuStat {
        user: field(1),
        nice: field(2),
        system: field(3),
        idle: field(4),
        iowait: field(5),
        irq: field(6),
        softirq: field(7),
        steal: field(8),
    })
}

/// Keeps the previous /proc/stat sample to turn counters into a load figure.
pub struct CpuStatsCache {
    previous: RwLock<Option<LoadSample>>,
}

#[derive(Debug, Clone, Copy)]
struct LoadSample {
    stat: CpuStat,
    load: f64,
}

impl Default for CpuStatsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStatsCache {
    pub fn new() -> Self {
        Self {
            previous: RwLock::new(None),
        }
    }

    /// Current CPU load in percent.
    ///
    /// Uses the delta against the previous call. The first call falls back to
    /// the average since boot; a call with no elapsed ticks repeats the last
    /// computed load and keeps the previous counters as the baseline.
    pub fn current_load(&self, root: &Path) -> Result<f64, CollectError> {
        let current = read_cpu_stat(root)?;

        let mut guard = match self.previous.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let load = match *guard {
            Some(prev) => match current.busy_percent_since(&prev.stat) {
                Some(load) => load,
                None => return Ok(prev.load),
            },
            None => current
                .busy_percent_since(&CpuStat::default())
                .unwrap_or(0.0),
        };

        *guard = Some(LoadSample {
            stat: current,
            load,
        });
        Ok(load)
    }
}

/// Reads MemTotal and MemAvailable from /proc/meminfo.
pub fn read_memory_info(root: &Path) -> Result<MemoryInfo, CollectError> {
    let path = root.join("meminfo");
    let content = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;

    let mut total_bytes: Option<u64> = None;
    let mut available_bytes: Option<u64> = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("MemTotal:") {
            total_bytes = parse_kb_value(v).map(|kb| kb * 1024);
        } else if let Some(v) = line.strip_prefix("MemAvailable:") {
            available_bytes = parse_kb_value(v).map(|kb| kb * 1024);
        }

        if total_bytes.is_some() && available_bytes.is_some() {
            break;
        }
    }

    match (total_bytes, available_bytes) {
        (Some(total_bytes), Some(available_bytes)) => Ok(MemoryInfo {
            total_bytes,
            available_bytes,
        }),
        _ => Err(CollectError::parse(
            &path,
            "MemTotal or MemAvailable missing",
        )),
    }
}

/// Reads system uptime from /proc/uptime.
///
/// Format: "<uptime_seconds> <idle_seconds>"
pub fn read_uptime(root: &Path) -> Result<f64, CollectError> {
    let path = root.join("uptime");
    let content = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;

    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| CollectError::parse(&path, "no fields found"))?;

    first
        .parse::<f64>()
        .map_err(|e| CollectError::parse(&path, format!("invalid uptime: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const STAT_FIXTURE: &str = "cpu  100 0 100 700 100 0 0 0 0 0\n\
                                cpu0 50 0 50 350 50 0 0 0 0 0\n\
                                btime 1700000000\n";

    #[test]
    fn test_read_cpu_stat() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT_FIXTURE).unwrap();

        let stat = read_cpu_stat(dir.path()).unwrap();
        assert_eq!(stat.user, 100);
        assert_eq!(stat.idle, 700);
        assert_eq!(stat.total(), 1000);
        assert_eq!(stat.idle_total(), 800);
    }

    #[test]
    fn test_read_cpu_stat_without_aggregate_line() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), "cpu0 1 2 3 4 5 6 7\n").unwrap();

        assert!(matches!(
            read_cpu_stat(dir.path()),
            Err(CollectError::Parse { .. })
        ));
    }

    #[test]
    fn test_current_load_first_call_uses_boot_average() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT_FIXTURE).unwrap();

        let cache = CpuStatsCache::new();
        let load = cache.current_load(dir.path()).unwrap();
        assert!((load - 20.0).abs() < 1e-9, "got {}", load);
    }

    #[test]
    fn test_current_load_uses_delta() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT_FIXTURE).unwrap();

        let cache = CpuStatsCache::new();
        cache.current_load(dir.path()).unwrap();

        // +100 busy ticks, +100 idle ticks
        std::fs::write(dir.path().join("stat"), "cpu  200 0 100 800 100 0 0 0\n").unwrap();
        let load = cache.current_load(dir.path()).unwrap();
        assert!((load - 50.0).abs() < 1e-9, "got {}", load);
    }

    #[test]
    fn test_current_load_without_elapsed_ticks() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT_FIXTURE).unwrap();

        let cache = CpuStatsCache::new();
        cache.current_load(dir.path()).unwrap();
        let load = cache.current_load(dir.path()).unwrap();
        assert!((load - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_load_same_tick_repeats_last_load() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("stat"), STAT_FIXTURE).unwrap();

        let cache = CpuStatsCache::new();
        cache.current_load(dir.path()).unwrap();

        // +90 busy ticks, +10 idle ticks
        std::fs::write(dir.path().join("stat"), "cpu  190 0 100 710 100 0 0 0\n").unwrap();
        let busy = cache.current_load(dir.path()).unwrap();
        assert!((busy - 90.0).abs() < 1e-9, "got {}", busy);

        // Counters unchanged: a concurrent poll in the same tick
        let same_tick = cache.current_load(dir.path()).unwrap();
        assert!((same_tick - 90.0).abs() < 1e-9, "got {}", same_tick);

        // The next real delta is measured from the 90% sample
        std::fs::write(dir.path().join("stat"), "cpu  200 0 100 800 100 0 0 0\n").unwrap();
        let next = cache.current_load(dir.path()).unwrap();
        assert!((next - 10.0).abs() < 1e-9, "got {}", next);
    }

    #[test]
    fn test_read_memory_info() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("meminfo"),
            "MemTotal:        4194304 kB\nMemFree:          524288 kB\nMemAvailable:    1048576 kB\n",
        )
        .unwrap();

        let mem = read_memory_info(dir.path()).unwrap();
        assert_eq!(mem.total_bytes, 4 * 1024 * 1024 * 1024);
        assert_eq!(mem.available_bytes, 1024 * 1024 * 1024);
        assert_eq!(mem.used_bytes(), 3 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_read_memory_info_missing_field() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("meminfo"), "MemTotal: 1024 kB\n").unwrap();

        assert!(read_memory_info(dir.path()).is_err());
    }

    #[test]
    fn test_used_bytes_saturates() {
        let mem = MemoryInfo {
            total_bytes: 10,
            available_bytes: 20,
        };
        assert_eq!(mem.used_bytes(), 0);
    }

    #[test]
    fn test_read_uptime() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("uptime"), "12345.67 54321.00\n").unwrap();

        let uptime = read_uptime(dir.path()).unwrap();
        assert!((uptime - 12345.67).abs() < 0.001);
    }

    #[test]
    fn test_read_uptime_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(matches!(
            read_uptime(dir.path()),
            Err(CollectError::Io { .. })
        ));
    }
}
