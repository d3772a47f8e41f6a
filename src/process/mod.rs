//! Process-related modules for the host process table.
//!
//! This module provides:
//! - `cpu`: CPU time and state parsing plus per-PID CPU history
//! - `memory`: Resident memory parsing from /proc/<pid>/status
//! - `scanner`: Process discovery and the parallel table scan

pub mod cpu;
pub mod memory;
pub mod scanner;

// Re-export commonly used types
pub use cpu::{parse_proc_stat, read_proc_stat, ProcStat, ProcessCpuTracker, CLK_TCK};
pub use memory::{parse_kb_value, read_rss_bytes};
pub use scanner::{
    cmp_by_cpu_desc, collect_proc_entries, read_process_name, scan_processes, ProcessInfo,
};
