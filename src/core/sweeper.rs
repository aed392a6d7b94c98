//! Periodic expiry driver
//!
//! The reserver has no timer of its own: reservations past their expiry keep
//! their outputs until someone calls `expire_reservations`. `ExpirySweeper`
//! is that someone: a tokio task that ticks on a fixed interval and sweeps
//! with the current wall-clock time until its shutdown token is cancelled.

use crate::core::traits::Reserver;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for the expiry sweeper
#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    /// Time between sweeps
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl SweepConfig {
    /// Create a config, falling back to the default for a zero interval
    pub fn new(interval: Duration) -> Self {
        if interval.is_zero() {
            let default = Self::default();
            warn!(
                default_ms = default.interval.as_millis() as u64,
                "Invalid sweep interval (0), using default"
            );
            return default;
        }
        Self { interval }
    }
}

/// Calls `expire_reservations` on a fixed period
pub struct ExpirySweeper<R: ?Sized> {
    reserver: Arc<R>,
    config: SweepConfig,
}

impl<R: Reserver + ?Sized + 'static> ExpirySweeper<R> {
    pub fn new(reserver: Arc<R>, config: SweepConfig) -> Self {
        Self { reserver, config }
    }

    /// Sweep once per interval until `shutdown` is cancelled
    ///
    /// The first sweep happens one full interval after start. Ticks missed
    /// because a sweep ran long are skipped rather than replayed.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.interval,
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Sweeper: shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.reserver.expire_reservations(Utc::now()).await {
                        warn!(error = %e, "Sweeper: expiry sweep failed");
                    }
                }
            }
        }
    }

    /// Run the sweeper on the current tokio runtime
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
