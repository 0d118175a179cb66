//! Session-change pub/sub.
//!
//! The host environment decides how changes travel between contexts (storage
//! events, IPC, polling); in-process consumers only see this bus. It is a
//! best-effort eventual-consistency channel, not a lock: deliveries carry no
//! payload, subscribers re-read the session they care about.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Callback>>,
}

/// In-process broadcast of "the session changed".
#[derive(Clone, Default)]
pub struct SessionBus {
    inner: Arc<BusInner>,
}

impl SessionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Delivery stops when the returned guard drops.
    pub fn subscribe(&self, callback: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .expect("session bus lock poisoned")
            .insert(id, Arc::new(callback));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Notify every live subscriber. Callbacks run outside the registry
    /// lock, so a callback may itself subscribe or publish.
    pub fn publish(&self) {
        let callbacks: Vec<Callback> = {
            let subscribers = self
                .inner
                .subscribers
                .lock()
                .expect("session bus lock poisoned");
            subscribers.values().cloned().collect()
        };
        for callback in callbacks {
            callback();
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .expect("session bus lock poisoned")
            .len()
    }
}

/// Active bus registration; unsubscribes on drop.
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            if let Ok(mut subscribers) = inner.subscribers.lock() {
                subscribers.remove(&self.id);
            }
        }
    }
}
