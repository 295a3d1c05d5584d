use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::notify::{NoticeVariant, NotificationBus};
use super::predictor::{ClockState, OptimisticClock, ServerSnapshot};
use crate::contract::TimeEngineApi;

/// Where confirmed balances come from.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch(&self, user_id: Uuid) -> anyhow::Result<ServerSnapshot>;
}

/// In-process source backed by the engine's public API.
pub struct LocalBalanceSource {
    api: Arc<dyn TimeEngineApi>,
}

impl LocalBalanceSource {
    pub fn new(api: Arc<dyn TimeEngineApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl BalanceSource for LocalBalanceSource {
    async fn fetch(&self, user_id: Uuid) -> anyhow::Result<ServerSnapshot> {
        let snapshot = self.api.get_balance(user_id).await?;
        Ok(ServerSnapshot {
            balance_hours: snapshot.balance,
            synced_at: snapshot.as_of,
        })
    }
}

/// Runs an [`OptimisticClock`]: renders every tick, resyncs periodically and
/// on demand. Rendered values are published on a `watch` channel.
pub struct ClockDriver {
    source: Arc<dyn BalanceSource>,
    user_id: Uuid,
    clock: Mutex<OptimisticClock>,
    last_snapshot: ArcSwapOption<ServerSnapshot>,
    display: watch::Sender<Option<f64>>,
    bus: NotificationBus,
    tick_interval: Duration,
    resync_interval: Duration,
}

impl ClockDriver {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        user_id: Uuid,
        bus: NotificationBus,
        tick_interval: Duration,
        resync_interval: Duration,
    ) -> Self {
        let (display, _) = watch::channel(None);
        Self {
            source,
            user_id,
            clock: Mutex::new(OptimisticClock::new()),
            last_snapshot: ArcSwapOption::empty(),
            display,
            bus,
            tick_interval,
            resync_interval,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<f64>> {
        self.display.subscribe()
    }

    pub fn state(&self) -> ClockState {
        self.clock.lock().state()
    }

    pub fn displayed(&self) -> Option<f64> {
        self.clock.lock().displayed()
    }

    pub fn last_snapshot(&self) -> Option<Arc<ServerSnapshot>> {
        self.last_snapshot.load_full()
    }

    /// Fetch a confirmed balance and restart prediction from it.
    pub async fn resync(&self) -> anyhow::Result<f64> {
        let snapshot = self.source.fetch(self.user_id).await?;
        let shown = {
            let mut clock = self.clock.lock();
            clock.sync(snapshot, Instant::now());
            clock.displayed()
        };
        self.last_snapshot.store(Some(Arc::new(snapshot)));
        self.display.send_replace(shown);
        debug!(user_id = %self.user_id, balance = snapshot.balance_hours, "clock resynced");
        Ok(snapshot.balance_hours)
    }

    /// User-triggered resync. Failure keeps the current display.
    pub async fn manual_refresh(&self) -> bool {
        match self.resync().await {
            Ok(_) => {
                self.bus.publish(
                    "Time refreshed",
                    Some("Your time balance has been updated".into()),
                    NoticeVariant::Default,
                );
                true
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "manual refresh failed");
                self.bus.publish(
                    "Failed to refresh time",
                    Some(e.to_string()),
                    NoticeVariant::Destructive,
                );
                false
            }
        }
    }

    fn render(&self, now: Instant) {
        let next = self.clock.lock().tick(now);
        if let Some(value) = next {
            self.display.send_replace(Some(value));
        }
    }

    /// Tick and resync until cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        if let Err(e) = self.resync().await {
            warn!(user_id = %self.user_id, error = %e, "initial sync failed");
        }

        let mut ticks = tokio::time::interval(self.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut resyncs =
            tokio::time::interval_at(Instant::now() + self.resync_interval, self.resync_interval);
        resyncs.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(user_id = %self.user_id, "clock stopped");
                    return Ok(());
                }
                now = ticks.tick() => self.render(now),
                _ = resyncs.tick() => {
                    if let Err(e) = self.resync().await {
                        warn!(user_id = %self.user_id, error = %e, "periodic resync failed");
                    }
                }
            }
        }
    }
}
