//! Filesystem statistics collector.
//!
//! Reads mounted filesystems from /proc/mounts and queries their usage with
//! statvfs(3). Only the primary volume ends up in a snapshot.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::CollectError;

/// Filesystem statistics for a single mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemStats {
    pub device: String,
    pub mount_point: String,
    pub fstype: String,
    pub size_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
}

/// Reads filesystem statistics from `<root>/mounts` and statvfs.
///
/// Mount points that cannot be stat'ed are skipped.
pub fn read_filesystem_stats(root: &Path) -> Result<Vec<FilesystemStats>, CollectError> {
    let path = root.join("mounts");
    let mounts_content = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;

    let mut stats = Vec::new();

    for line in mounts_content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let (device, mount_point, fstype) = (parts[0], parts[1], parts[2]);

        if should_skip_filesystem(fstype, mount_point) {
            continue;
        }

        match get_statvfs_stats(mount_point) {
            Ok((size_bytes, available_bytes, used_bytes)) => stats.push(FilesystemStats {
                device: device.to_string(),
                mount_point: mount_point.to_string(),
                fstype: fstype.to_string(),
                size_bytes,
                available_bytes,
                used_bytes,
            }),
            Err(e) => debug!("Skipping {}: {}", mount_point, e),
        }
    }

    Ok(stats)
}

/// The root mount if present, otherwise the first real filesystem.
pub fn primary_filesystem(stats: &[FilesystemStats]) -> Option<&FilesystemStats> {
    stats
        .iter()
        .find(|fs| fs.mount_point == "/")
        .or_else(|| stats.first())
}

/// Checks if a filesystem should be skipped based on type and mount point.
fn should_skip_filesystem(fstype: &str, mount_point: &str) -> bool {
    let skip_types = [
        "proc",
        "sysfs",
        "devpts",
        "devtmpfs",
        "tmpfs",
        "cgroup",
        "cgroup2",
        "pstore",
        "bpf",
        "debugfs",
        "tracefs",
        "fusectl",
        "configfs",
        "securityfs",
        "hugetlbfs",
        "mqueue",
        "autofs",
        "binfmt_misc",
        "squashfs",
        "nsfs",
    ];

    if skip_types.contains(&fstype) {
        return true;
    }

    mount_point.starts_with("/proc")
        || mount_point.starts_with("/sys")
        || mount_point.starts_with("/dev")
        || mount_point.starts_with("/run")
        || mount_point.starts_with("/snap")
}

/// Gets (size, available, used) in bytes using libc statvfs.
fn get_statvfs_stats(path: &str) -> Result<(u64, u64, u64), String> {
    use std::ffi::CString;
    use std::mem;

    let c_path = CString::new(path).map_err(|e| format!("Invalid path: {}", e))?;

    // SAFETY: c_path is a valid NUL-terminated string and stat is a plain C
    // struct that statvfs fully initialises on success.
    unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(format!("statvfs failed for {}", path));
        }

        let block_size = stat.f_frsize as u64;
        let size_bytes = block_size * stat.f_blocks as u64;
        let available_bytes = block_size * stat.f_bavail as u64;
        let used_bytes = size_bytes.saturating_sub(block_size * stat.f_bfree as u64);

        Ok((size_bytes, available_bytes, used_bytes))
    }
}
