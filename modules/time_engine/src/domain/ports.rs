use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Output port: publish domain events (no knowledge of transport).
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}

/// Publisher that drops everything; used when nobody listens.
pub struct NoopPublisher;

impl<E> EventPublisher<E> for NoopPublisher {
    fn publish(&self, _event: &E) {}
}

/// Wall-clock source. Injected so decay and reconciliation are testable.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Daily streak maintenance, owned by the store.
#[async_trait]
pub trait StreakRoutine: Send + Sync {
    /// Returns the number of profiles touched.
    async fn update_streaks(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;
}
