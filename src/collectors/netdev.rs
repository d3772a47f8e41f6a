//! Network interface statistics collector.
//!
//! Reads byte counters from /proc/net/dev, picks the primary interface and
//! turns successive counter readings into receive/transmit rates.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::CollectError;

/// Network interface byte counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetDevStats {
    pub receive_bytes: u64,
    pub transmit_bytes: u64,
}

/// Receive/transmit throughput of one interface, in bytes per second.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetRate {
    pub interface: String,
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

/// Reads network interface statistics from /proc/net/dev.
///
/// Returns a HashMap mapping interface names to their statistics.
pub fn read_netdev_stats(root: &Path) -> Result<HashMap<String, NetDevStats>, CollectError> {
    let path = root.join("net/dev");
    let content = fs::read_to_string(&path).map_err(|e| CollectError::io(&path, e))?;

    let mut stats = HashMap::new();

    // The first two lines are headers
    for line in content.lines().skip(2) {
        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        stats.insert(
            interface.trim().to_string(),
            NetDevStats {
                receive_bytes: values[0].parse().unwrap_or(0),
                transmit_bytes: values[8].parse().unwrap_or(0),
            },
        );
    }

    Ok(stats)
}

/// Returns the interface carrying the default route, if any.
///
/// /proc/net/route lists destinations in hex; the default route is 00000000.
pub fn read_default_interface(root: &Path) -> Option<String> {
    let content = fs::read_to_string(root.join("net/route")).ok()?;

    content.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}

/// Picks the primary interface: the default-route one when it has counters,
/// otherwise the first non-loopback interface by name.
pub fn select_primary_interface(
    stats: &HashMap<String, NetDevStats>,
    default_iface: Option<&str>,
) -> Option<String> {
    if let Some(iface) = default_iface {
        if stats.contains_key(iface) {
            return Some(iface.to_string());
        }
    }

    let mut names: Vec<&String> = stats.keys().filter(|name| name.as_str() != "lo").collect();
    names.sort();
    names.first().map(|name| name.to_string())
}

struct RateSample {
    interface: String,
    stats: NetDevStats,
    taken_at: Instant,
}

/// Remembers the last counter reading to compute per-second rates.
#[derive(Default)]
pub struct NetRateCache {
    previous: Mutex<Option<RateSample>>,
}

impl NetRateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples the primary interface and returns its rate since the last call.
    ///
    /// Returns `Ok(None)` when the host has no usable interface. The first
    /// call, and any call after the primary interface changed, reports zero.
    pub fn sample(&self, root: &Path) -> Result<Option<NetRate>, CollectError> {
        let stats = read_netdev_stats(root)?;
        let default_iface = read_default_interface(root);

        let Some(interface) = select_primary_interface(&stats, default_iface.as_deref()) else {
            return Ok(None);
        };
        let current = stats[&interface];

        Ok(Some(self.record(interface, current, Instant::now())))
    }

    fn record(&self, interface: String, current: NetDevStats, now: Instant) -> NetRate {
        let mut rate = NetRate {
            interface: interface.clone(),
            ..NetRate::default()
        };

        if let Ok(mut guard) = self.previous.lock() {
            if let Some(prev) = guard.as_ref().filter(|p| p.interface == interface) {
                let dt = now.duration_since(prev.taken_at).as_secs_f64();
                if dt > 0.0 {
                    rate.rx_bytes_per_sec = current
                        .receive_bytes
                        .saturating_sub(prev.stats.receive_bytes)
                        as f64
                        / dt;
                    rate.tx_bytes_per_sec = current
                        .transmit_bytes
                        .saturating_sub(prev.stats.transmit_bytes)
                        as f64
                        / dt;
                }
            }

            *guard = Some(RateSample {
                interface,
                stats: current,
                taken_at: now,
            });
        }

        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit\n \
face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
lo:  1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0\n  \
eth0: 5000      50    0    0    0     0          0         0     7000      70    0    0    0     0       0          0\n  \
wlan0: 300      3    0    0    0     0          0         0     400      4    0    0    0     0       0          0\n";

    const NET_ROUTE: &str = "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT\n\
wlan0\t0000A8C0\t00000000\t0001\t0\t0\t600\t00FFFFFF\t0\t0\t0\n\
eth0\t00000000\t0100A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n";

    fn write_fixture(root: &Path, net_dev: &str, route: Option<&str>) {
        std::fs::create_dir_all(root.join("net")).unwrap();
        std::fs::write(root.join("net/dev"), net_dev).unwrap();
        if let Some(route) = route {
            std::fs::write(root.join("net/route"), route).unwrap();
        }
    }

    #[test]
    fn test_read_netdev_stats() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_fixture(dir.path(), NET_DEV, None);

        let stats = read_netdev_stats(dir.path()).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(
            stats["eth0"],
            NetDevStats {
                receive_bytes: 5000,
                transmit_bytes: 7000
            }
        );
    }

    #[test]
    fn test_default_route_wins() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_fixture(dir.path(), NET_DEV, Some(NET_ROUTE));

        let stats = read_netdev_stats(dir.path()).unwrap();
        let default_iface = read_default_interface(dir.path());
        assert_eq!(default_iface.as_deref(), Some("eth0"));
        assert_eq!(
            select_primary_interface(&stats, default_iface.as_deref()).as_deref(),
            Some("eth0")
        );
    }

    #[test]
    fn test_fallback_skips_loopback() {
        let mut stats = HashMap::new();
        let zero = NetDevStats {
            receive_bytes: 0,
            transmit_bytes: 0,
        };
        stats.insert("lo".to_string(), zero);
        stats.insert("wlan0".to_string(), zero);
        stats.insert("enp3s0".to_string(), zero);

        assert_eq!(
            select_primary_interface(&stats, None).as_deref(),
            Some("enp3s0")
        );
        assert_eq!(
            select_primary_interface(&stats, Some("docker0")).as_deref(),
            Some("enp3s0")
        );
    }

    #[test]
    fn test_only_loopback_means_no_interface() {
        let mut stats = HashMap::new();
        stats.insert(
            "lo".to_string(),
            NetDevStats {
                receive_bytes: 1,
                transmit_bytes: 1,
            },
        );
        assert_eq!(select_primary_interface(&stats, None), None);
    }

    #[test]
    fn test_rate_between_samples() {
        let cache = NetRateCache::new();
        let start = Instant::now();

        let first = cache.record(
            "eth0".into(),
            NetDevStats {
                receive_bytes: 1_000,
                transmit_bytes: 2_000,
            },
            start,
        );
        assert_eq!(first.rx_bytes_per_sec, 0.0);
        assert_eq!(first.tx_bytes_per_sec, 0.0);

        let second = cache.record(
            "eth0".into(),
            NetDevStats {
                receive_bytes: 3_000,
                transmit_bytes: 2_500,
            },
            start + Duration::from_secs(2),
        );
        assert!((second.rx_bytes_per_sec - 1_000.0).abs() < 1e-9);
        assert!((second.tx_bytes_per_sec - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_interface_change_resets_rate() {
        let cache = NetRateCache::new();
        let start = Instant::now();
        let counters = NetDevStats {
            receive_bytes: 10_000,
            transmit_bytes: 10_000,
        };

        cache.record("eth0".into(), counters, start);
        let rate = cache.record("wlan0".into(), counters, start + Duration::from_secs(1));
        assert_eq!(rate.interface, "wlan0");
        assert_eq!(rate.rx_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_sample_reads_fixture() {
        let dir = tempdir().expect("Failed to create temp dir");
        write_fixture(dir.path(), NET_DEV, Some(NET_ROUTE));

        let cache = NetRateCache::new();
        let rate = cache.sample(dir.path()).unwrap().expect("primary interface");
        assert_eq!(rate.interface, "eth0");
    }
}
