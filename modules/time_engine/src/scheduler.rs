use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::service::Service;

/// Runs a reconciliation pass on a fixed interval until cancelled.
pub struct ReconcileScheduler {
    service: Arc<Service>,
    interval: Duration,
}

impl ReconcileScheduler {
    pub fn new(service: Arc<Service>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// The first pass runs immediately. A failed pass is logged and the loop
    /// keeps going.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "reconcile scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.service.reconcile().await {
                        Ok(summary) => info!(
                            profiles_updated = summary.profiles_updated,
                            profiles_failed = summary.profiles_failed,
                            streaks_updated = ?summary.streaks_updated,
                            "reconcile pass finished"
                        ),
                        Err(e) => error!(error = %e, "reconcile pass failed"),
                    }
                }
            }
        }
        info!("reconcile scheduler stopped");
    }
}
