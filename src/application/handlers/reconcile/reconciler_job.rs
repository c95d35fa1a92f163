//! ReconcilerJob - runs the AutoReconciler on a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{info, warn};

use super::AutoReconciler;

pub struct ReconcilerJob {
    reconciler: Arc<AutoReconciler>,
    interval: Duration,
}

impl ReconcilerJob {
    pub fn new(reconciler: Arc<AutoReconciler>, interval: Duration) -> Self {
        Self { reconciler, interval }
    }

    /// Runs until `shutdown` flips to true.
    ///
    /// The first pass starts immediately. A failed pass is logged and the
    /// loop waits for the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "Reconciler job started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reconciler job stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.reconciler.run().await {
                        warn!(error = %e, "Reconciliation pass failed");
                    }
                }
            }
        }
    }
}
