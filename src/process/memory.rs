//! Memory parsing utilities for per-process metrics.
//!
//! Reads the resident set size from `/proc/<pid>/status`.

use std::fs;
use std::path::Path;

/// Parses kilobyte values from /proc lines such as `   16318412 kB`.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Reads VmRSS from /proc/[pid]/status.
/// Returns resident memory in bytes; kernel threads have no VmRSS and report 0.
pub fn read_rss_bytes(proc_path: &Path) -> Result<u64, std::io::Error> {
    let content = fs::read_to_string(proc_path.join("status"))?;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("VmRSS:") {
            if let Some(kb) = parse_kb_value(v) {
                return Ok(kb * 1024);
            }
        }
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_kb_value() {
        assert_eq!(parse_kb_value("       1234 kB"), Some(1234));
        assert_eq!(parse_kb_value("1234 kB"), Some(1234));
        assert_eq!(parse_kb_value("0 kB"), Some(0));
        assert_eq!(parse_kb_value("  42  "), Some(42));
        assert_eq!(parse_kb_value("18446744073709551615"), Some(u64::MAX));
    }

    #[test]
    fn test_parse_kb_value_invalid() {
        assert_eq!(parse_kb_value(""), None);
        assert_eq!(parse_kb_value("   "), None);
        assert_eq!(parse_kb_value("kB"), None);
        assert_eq!(parse_kb_value("-1 kB"), None);
        assert_eq!(parse_kb_value("1.5 kB"), None);
    }

    #[test]
    fn test_read_rss_bytes() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(
            dir.path().join("status"),
            "Name:\tnginx\nState:\tS (sleeping)\nVmPeak:\t  20000 kB\nVmRSS:\t   51200 kB\n",
        )
        .unwrap();

        assert_eq!(read_rss_bytes(dir.path()).unwrap(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_read_rss_bytes_kernel_thread() {
        let dir = tempdir().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("status"), "Name:\tkworker/0:1\nState:\tI (idle)\n")
            .unwrap();

        assert_eq!(read_rss_bytes(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_read_rss_bytes_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        assert!(read_rss_bytes(dir.path()).is_err());
    }
}
