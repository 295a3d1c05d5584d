use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Transient, user-facing notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub variant: NoticeVariant,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("notification bus is full ({capacity} subscribers)")]
pub struct BusFull {
    pub capacity: usize,
}

type Callback = Arc<dyn Fn(&Notice) + Send + Sync>;

struct Inner {
    capacity: usize,
    next_notice: AtomicU64,
    next_subscriber: AtomicU64,
    subscribers: Mutex<BTreeMap<u64, Callback>>,
}

/// Owned publish/subscribe channel for notices. Each bus has its own bounded
/// subscriber set; dropping a [`Subscription`] unsubscribes it.
#[derive(Clone)]
pub struct NotificationBus {
    inner: Arc<Inner>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity: capacity.max(1),
                next_notice: AtomicU64::new(1),
                next_subscriber: AtomicU64::new(1),
                subscribers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, BusFull>
    where
        F: Fn(&Notice) + Send + Sync + 'static,
    {
        let mut subscribers = self.inner.subscribers.lock();
        if subscribers.len() >= self.inner.capacity {
            return Err(BusFull {
                capacity: self.inner.capacity,
            });
        }
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        subscribers.insert(id, Arc::new(callback));
        Ok(Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        })
    }

    /// Deliver to every current subscriber; returns the notice id.
    pub fn publish(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        variant: NoticeVariant,
    ) -> u64 {
        let notice = Notice {
            id: self.inner.next_notice.fetch_add(1, Ordering::Relaxed),
            title: title.into(),
            description,
            variant,
        };
        // Callbacks run outside the lock so they may subscribe or drop handles.
        let callbacks: Vec<Callback> = self.inner.subscribers.lock().values().cloned().collect();
        for callback in callbacks {
            callback(&notice);
        }
        notice.id
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

pub struct Subscription {
    id: u64,
    bus: Weak<Inner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.subscribers.lock().remove(&self.id);
        }
    }
}
