use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::dto::TimeEvent;
use crate::domain::events::TimeDomainEvent;
use crate::domain::ports::EventPublisher;

/// Typed SSE fan-out over `tokio::sync::broadcast`.
/// Lagging subscribers lose the oldest events instead of blocking senders.
#[derive(Clone)]
pub struct SseBroadcaster<T> {
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> SseBroadcaster<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// No subscribers is not an error.
    pub fn send(&self, value: T) {
        let _ = self.tx.send(value);
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Typed stream; lag errors are filtered out.
    pub fn subscribe_stream(&self) -> impl Stream<Item = T> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|res| async move { res.ok() })
    }

    /// SSE response with JSON payloads named `event_name` and periodic keepalives.
    pub fn sse_response(
        &self,
        event_name: &'static str,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
    where
        T: Serialize,
    {
        let stream = self.subscribe_stream().map(move |msg| {
            let ev = Event::default()
                .event(event_name)
                .json_data(&msg)
                .unwrap_or_else(|_| Event::default().event(event_name).data("serialization_error"));
            Ok(ev)
        });
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keepalive"),
        )
    }
}

/// Forwards domain events to SSE subscribers.
pub struct SseEventPublisher {
    out: SseBroadcaster<TimeEvent>,
}

impl SseEventPublisher {
    pub fn new(out: SseBroadcaster<TimeEvent>) -> Self {
        Self { out }
    }
}

impl EventPublisher<TimeDomainEvent> for SseEventPublisher {
    fn publish(&self, event: &TimeDomainEvent) {
        self.out.send(TimeEvent::from(event));
    }
}
