//! Optional proactive refresh sweep.
//!
//! Not required for correctness: the lazy `Stale` trigger alone keeps the
//! cache correct. The sweep refreshes entries *nearing* TTL expiry so
//! steady-state request latency never pays for a synchronous provider fetch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::orchestrator::SyncOrchestrator;

/// Sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to scan the cache.
    pub interval: Duration,
    /// Refresh entries whose remaining freshness is below this margin.
    pub refresh_margin: chrono::Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            refresh_margin: chrono::Duration::seconds(30),
        }
    }
}

/// Handle to control a running sweeper.
pub struct SweepHandle {
    shutdown: mpsc::Sender<()>,
    join: tokio::task::JoinHandle<()>,
}

impl SweepHandle {
    /// Request graceful shutdown and wait for the sweeper to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(()).await;
        let _ = self.join.await;
    }
}

/// Spawn the periodic sweeper.
pub fn spawn_sweeper(orchestrator: Arc<SyncOrchestrator>, config: SweepConfig) -> SweepHandle {
    let (shutdown, mut shutdown_rx) = mpsc::channel(1);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        // The first tick fires immediately; skip it so a freshly-started
        // sweeper doesn't race the initial login syncs.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::debug!("permission sweep stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let due = orchestrator
                        .cache()
                        .subjects_near_expiry(now, config.refresh_margin);
                    if due.is_empty() {
                        continue;
                    }

                    tracing::debug!(subjects = due.len(), "proactively refreshing near-expiry entries");
                    for subject_id in due {
                        // Failures here are not an event: the lazy trigger
                        // will retry on the next read, rate-limited by TTL.
                        let _ = orchestrator.refresh_now(&subject_id).await;
                    }
                }
            }
        }
    });

    SweepHandle { shutdown, join }
}
