//! Startup requirement validation for system-api.
//!
//! This module validates that the service can read host state and reach the
//! process manager before it starts serving. Only an unreadable procfs is an
//! error; everything else is reported and the service starts anyway.

use nix::unistd::geteuid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(
    proc_root: &Path,
    pm2_binary: Option<&Path>,
) -> Result<(), ValidationError> {
    info!("Validating runtime requirements...");

    check_user_privileges();
    check_proc_access(proc_root)?;

    if let Some(binary) = pm2_binary {
        check_pm2_binary(binary);
    }

    info!("All runtime requirements validated");
    Ok(())
}

/// Other users' process details may be hidden from non-root readers.
fn check_user_privileges() {
    if geteuid().is_root() {
        info!("Running as root (uid=0)");
    } else {
        warn!("Not running as root - memory of other users' processes may read as 0");
    }
}

/// Check that the host-wide procfs files can be read.
fn check_proc_access(proc_root: &Path) -> Result<(), ValidationError> {
    for file in ["stat", "meminfo", "uptime"] {
        let path = proc_root.join(file);
        if let Err(e) = fs::read_to_string(&path) {
            error!("Cannot read {}: {}", path.display(), e);
            return Err(ValidationError::ProcUnreadable {
                path,
                reason: e.to_string(),
            });
        }
    }

    info!("procfs access at {}: OK", proc_root.display());
    Ok(())
}

/// Resolves a binary name against `PATH`; explicit paths must be executable.
pub fn find_executable(binary: &Path) -> Option<PathBuf> {
    which::which(binary).ok()
}

fn check_pm2_binary(binary: &Path) {
    match find_executable(binary) {
        Some(path) => info!("Process manager binary found at {}", path.display()),
        None => {
            warn!(
                "Process manager binary '{}' not found or not executable - services will be reported empty",
                binary.display()
            );
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("cannot read {}: {reason}", path.display())]
    ProcUnreadable { path: PathBuf, reason: String },
}
