pub mod balance;
pub mod decay;
pub mod error;
pub mod events;
pub mod ports;
pub mod rank;
pub mod reconciler;
pub mod repo;
pub mod reward;
pub mod service;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use error::DomainError;
use events::TimeDomainEvent;
use ports::{EventPublisher, StreakRoutine, TimeSource};
use repo::{MissionRepository, ProfileRepository, QuestionRepository};

/// Ports shared by every domain component.
#[derive(Clone)]
pub struct EngineDeps {
    pub profiles: Arc<dyn ProfileRepository>,
    pub missions: Arc<dyn MissionRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub streaks: Arc<dyn StreakRoutine>,
    pub events: Arc<dyn EventPublisher<TimeDomainEvent>>,
    pub clock: Arc<dyn TimeSource>,
    pub store_timeout: Duration,
}

impl EngineDeps {
    /// Run a store call under the configured timeout.
    ///
    /// Store errors become retryable `Storage` errors, expiry becomes `Timeout`.
    pub(crate) async fn store<T, F>(&self, operation: &'static str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::storage(format!("{operation}: {e:#}"))),
            Err(_) => Err(DomainError::timeout(operation, self.store_timeout)),
        }
    }
}
