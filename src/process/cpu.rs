//! CPU statistics parsing for process metrics.
//!
//! This module provides functions to parse CPU time and scheduler state from
//! `/proc/<pid>/stat` and keeps per-process CPU time history for delta
//! calculations.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;
use std::sync::RwLock as StdRwLock;
use std::time::Instant;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Fields of /proc/<pid>/stat needed for a process sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcStat {
    /// Command name between the parentheses of field 2.
    pub comm: String,
    /// Single-letter scheduler state (field 3), e.g. `R`, `S`, `Z`.
    pub state: char,
    /// utime + stime in seconds.
    pub cpu_time_seconds: f64,
}

/// Parses the content of /proc/<pid>/stat.
///
/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`.
pub fn parse_proc_stat(content: &str) -> Option<ProcStat> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close <= open {
        return None;
    }

    let comm = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();

    // rest[0] is field 3 (state); utime/stime are fields 14/15
    if rest.len() <= 12 {
        return None;
    }

    let state = rest[0].chars().next()?;
    let utime: f64 = rest[11].parse().unwrap_or(0.0);
    let stime: f64 = rest[12].parse().unwrap_or(0.0);

    Some(ProcStat {
        comm,
        state,
        cpu_time_seconds: (utime + stime) / *CLK_TCK,
    })
}

/// Reads and parses /proc/<pid>/stat.
pub fn read_proc_stat(proc_path: &Path) -> Result<ProcStat, std::io::Error> {
    let content = fs::read_to_string(proc_path.join("stat"))?;
    parse_proc_stat(&content).ok_or_else(|| std::io::Error::other("Invalid stat format"))
}

/// Cache entry with timestamp for delta-based CPU calculation.
struct CpuEntry {
    cpu_time_seconds: f64,
    last_updated: Instant,
}

/// Per-PID CPU time history used to turn cumulative CPU time into a percentage.
#[derive(Default)]
pub struct ProcessCpuTracker {
    cache: StdRwLock<HashMap<u32, CpuEntry>>,
}

impl ProcessCpuTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a CPU time reading and returns the CPU percentage since the
    /// previous reading for the same PID (0 for the first reading).
    pub fn observe(&self, pid: u32, cpu_time_seconds: f64, now: Instant) -> f64 {
        let mut cpu_percent = 0.0;

        if let Ok(cache) = self.cache.read() {
            if let Some(entry) = cache.get(&pid) {
                let dt = now.duration_since(entry.last_updated).as_secs_f64();
                let delta_cpu = cpu_time_seconds - entry.cpu_time_seconds;
                if dt > 0.0 && delta_cpu > 0.0 {
                    cpu_percent = (delta_cpu / dt) * 100.0;
                }
            }
        }

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                pid,
                CpuEntry {
                    cpu_time_seconds,
                    last_updated: now,
                },
            );
        }

        cpu_percent
    }

    /// Drops history for PIDs that were not seen in the latest scan.
    pub fn retain(&self, live: &[u32]) {
        if let Ok(mut cache) = self.cache.write() {
            let live: ahash::AHashSet<u32> = live.iter().copied().collect();
            cache.retain(|pid, _| live.contains(pid));
        }
    }

    pub fn tracked(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}
