//! CLI command implementations for system-api.
//!
//! This module provides implementations for all CLI subcommands:
//! - `sample`: Collect snapshots and print them as JSON

pub mod sample;

// Re-export command functions
pub use sample::command_sample;
