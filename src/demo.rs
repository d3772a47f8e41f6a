//! Demo event feed.
//!
//! Two background tasks that keep the dashboard's log and alert panels moving
//! when there is no real event source: one appends a random log line every
//! log period, the other appends a random alert every alert period with a
//! fixed probability.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::events::{AlertKind, EventLog, Severity};

const LOG_SERVICES: [&str; 5] = ["Strapi", "PostgreSQL", "Redis", "Nginx", "PM2"];

const LOG_MESSAGES: [&str; 8] = [
    "Request processed successfully",
    "Database connection established",
    "Cache hit ratio optimal",
    "Health check passed",
    "Backup completed successfully",
    "Memory usage normal",
    "SSL certificate validated",
    "Load balancer active",
];

const ALERT_SERVICES: [&str; 5] = ["Strapi", "PostgreSQL", "Redis", "Nginx", "System"];

fn alert_messages(kind: AlertKind) -> &'static [&'static str] {
    match kind {
        AlertKind::Critical => &[
            "High memory usage detected (>90%)",
            "Service downtime detected",
        ],
        AlertKind::Warning => &["Memory usage above 80%", "High CPU usage detected"],
        AlertKind::Info => &["System backup completed", "Service restarted successfully"],
    }
}

/// Timing and probability of the demo feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoSettings {
    pub log_interval: Duration,
    pub alert_interval: Duration,
    /// Chance in [0, 1] that an alert tick produces an alert.
    pub alert_probability: f64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            log_interval: Duration::from_secs(5),
            alert_interval: Duration::from_secs(30),
            alert_probability: 0.2,
        }
    }
}

/// A random demo log line: level, service, message.
pub fn random_log(rng: &mut impl Rng) -> (Severity, &'static str, &'static str) {
    let level = Severity::ALL[rng.gen_range(0..Severity::ALL.len())];
    let service = LOG_SERVICES[rng.gen_range(0..LOG_SERVICES.len())];
    let message = LOG_MESSAGES[rng.gen_range(0..LOG_MESSAGES.len())];
    (level, service, message)
}

/// A random demo alert, or `None` when this tick stays quiet.
pub fn random_alert(
    rng: &mut impl Rng,
    probability: f64,
) -> Option<(AlertKind, &'static str, &'static str)> {
    if rng.gen::<f64>() >= probability {
        return None;
    }

    let kind = *AlertKind::ALL.choose(rng)?;
    let service = *ALERT_SERVICES.choose(rng)?;
    let message = *alert_messages(kind).choose(rng)?;
    Some((kind, service, message))
}

/// Handle to the running demo tasks.
pub struct DemoFeed {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl DemoFeed {
    /// Starts both producers. The first tick of each happens one period
    /// after this call.
    pub fn spawn(event_log: Arc<EventLog>, settings: DemoSettings) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let log_task = {
            let event_log = Arc::clone(&event_log);
            let mut shutdown_rx = shutdown_rx.clone();
            let period = settings.log_interval;
            tokio::spawn(async move {
                let mut rng = StdRng::from_entropy();
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = ticker.tick() => {
                            let (level, service, message) = random_log(&mut rng);
                            event_log.append_log(level, service, message);
                        }
                    }
                }
                debug!("Demo log producer stopped");
            })
        };

        let alert_task = {
            let mut shutdown_rx = shutdown_rx;
            let period = settings.alert_interval;
            let probability = settings.alert_probability;
            tokio::spawn(async move {
                let mut rng = StdRng::from_entropy();
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = ticker.tick() => {
                            if let Some((kind, service, message)) = random_alert(&mut rng, probability) {
                                event_log.append_alert(kind, service, message);
                            }
                        }
                    }
                }
                debug!("Demo alert producer stopped");
            })
        };

        info!(
            "Demo event feed started (logs every {:?}, alerts every {:?} at p={})",
            settings.log_interval, settings.alert_interval, settings.alert_probability
        );

        Self {
            shutdown_tx,
            handles: vec![log_task, alert_task],
        }
    }

    /// Stops both producers and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Demo feed task ended abnormally: {}", e);
            }
        }
        info!("Demo event feed stopped");
    }
}
