//! Sample command implementation.
//!
//! Collects snapshots the same way `/metrics` does and prints them as JSON.

use anyhow::Context;
use std::io::Write;
use std::time::Duration;

use crate::collector::Collector;

/// Collects `iterations` snapshots, `interval` apart, and writes them to `out`.
///
/// Pretty-printed by default; `compact` writes one document per line.
pub async fn command_sample(
    collector: &Collector,
    iterations: usize,
    interval: Duration,
    compact: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for iteration in 1..=iterations {
        let snapshot = collector
            .sample()
            .await
            .with_context(|| format!("sample {}/{} failed", iteration, iterations))?;

        let json = if compact {
            serde_json::to_string(&snapshot)?
        } else {
            serde_json::to_string_pretty(&snapshot)?
        };
        writeln!(out, "{json}")?;

        if iteration < iterations {
            tokio::time::sleep(interval).await;
        }
    }

    out.flush()?;
    Ok(())
}
