//! Collectors module for system metrics.
//!
//! This module contains collectors for the filesystem usage and network
//! interface statistics that go into a snapshot.

pub mod filesystem;
pub mod netdev;

pub use filesystem::{primary_filesystem, read_filesystem_stats, FilesystemStats};
pub use netdev::{NetRate, NetRateCache};
