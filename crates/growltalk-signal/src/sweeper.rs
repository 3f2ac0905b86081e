//! Expiry sweeper - background session cleanup
//!
//! Every half TTL the sweeper evicts callers that stopped refreshing their
//! session. Long-poll waiters are not notified; their next retry simply sees
//! the post-sweep registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::registry::Registry;

/// Periodic evictor of stale callers
pub struct ExpirySweeper {
    registry: Arc<Registry>,
    period: Duration,
}

impl ExpirySweeper {
    /// Sweep on the registry's half-life
    pub fn new(registry: Arc<Registry>) -> Self {
        let period = registry.half_life();
        Self { registry, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run a single sweep and report how many callers were evicted
    pub fn sweep_once(&self) -> usize {
        let evicted = self.registry.sweep();
        if evicted > 0 {
            info!(
                "Expired {} caller(s), {} remaining",
                evicted,
                self.registry.len()
            );
        } else {
            debug!("Sweep found no expired callers");
        }
        evicted
    }

    /// Run the sweep loop (call from a tokio task)
    pub async fn run_loop(self) {
        let mut tick = interval_at(Instant::now() + self.period, self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tick.tick().await;
            self.sweep_once();
        }
    }

    /// Spawn the sweep loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        info!("Sweeping expired callers every {:?}", self.period);
        tokio::spawn(self.run_loop())
    }
}
