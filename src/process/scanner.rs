//! Process scanning utilities for discovering and reading process entries from /proc.
//!
//! This module provides functions to scan the /proc filesystem for process
//! entries and read the per-process facts that go into a snapshot.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::trace;

use crate::process::cpu::{read_proc_stat, ProcessCpuTracker};
use crate::process::memory::read_rss_bytes;

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// One row of the host process table, as read from /proc.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub rss_bytes: u64,
    /// Scheduler state letter from /proc/<pid>/stat.
    pub state: char,
}

/// Scans /proc directory for process entries with numeric PIDs.
pub fn collect_proc_entries(root: &Path) -> Vec<ProcEntry> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let pid: u32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            out.push(ProcEntry { pid, proc_path: p });
        }
    }
    out
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let content = fs::read(proc_path.join("cmdline")).ok()?;
    let first = content.split(|&b| b == 0u8).next()?;
    let first = std::str::from_utf8(first).ok()?;
    Path::new(first)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
}

/// Busiest first; equal CPU falls back to ascending pid.
pub fn cmp_by_cpu_desc(a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
    b.cpu_percent
        .partial_cmp(&a.cpu_percent)
        .unwrap_or(Ordering::Equal)
        .then(a.pid.cmp(&b.pid))
}

/// Reads the full process table in parallel.
///
/// Processes that exit mid-scan (or whose stat is unreadable) are skipped.
/// CPU percentages are relative to the previous scan seen by `tracker`.
/// With `max` set, only the `max` busiest processes are returned; every pid
/// is still read so that the ranking and CPU history cover the whole table.
pub fn scan_processes(
    root: &Path,
    max: Option<usize>,
    tracker: &ProcessCpuTracker,
) -> Vec<ProcessInfo> {
    let entries = collect_proc_entries(root);
    let now = Instant::now();

    let mut processes: Vec<ProcessInfo> = entries
        .par_iter()
        .filter_map(|entry| {
            let stat = match read_proc_stat(&entry.proc_path) {
                Ok(stat) => stat,
                Err(e) => {
                    trace!("Skipping pid {}: {}", entry.pid, e);
                    return None;
                }
            };
            let name = read_process_name(&entry.proc_path).unwrap_or_else(|| stat.comm.clone());
            let rss_bytes = read_rss_bytes(&entry.proc_path).unwrap_or(0);
            let cpu_percent = tracker.observe(entry.pid, stat.cpu_time_seconds, now);

            Some(ProcessInfo {
                pid: entry.pid,
                name,
                cpu_percent,
                rss_bytes,
                state: stat.state,
            })
        })
        .collect();

    let live: Vec<u32> = processes.iter().map(|p| p.pid).collect();
    tracker.retain(&live);

    if let Some(max) = max {
        processes.sort_by(cmp_by_cpu_desc);
        processes.truncate(max);
    }
    processes
}
