//! Best-effort broadcast hub
//!
//! Every subscriber owns a bounded queue. Publishing never waits: a
//! subscriber whose queue is full or whose receiver is gone is evicted.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DeliveryError;
use crate::protocol::{Reading, ReadingEvent};

/// Subscriber identifier
pub type SubscriberId = Uuid;

/// Kind of a live event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Full device state, sent once when a subscriber joins
    Snapshot,
    /// One accepted reading
    Reading,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Snapshot => "snapshot",
            EventKind::Reading => "reading",
        }
    }
}

/// Serialized event, shared between all subscriber queues
#[derive(Debug, Clone)]
pub struct HubEvent {
    pub kind: EventKind,
    /// JSON payload
    pub data: Arc<str>,
}

impl HubEvent {
    pub fn new<T: serde::Serialize>(kind: EventKind, payload: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(payload)?;
        Ok(Self {
            kind,
            data: data.into(),
        })
    }

    pub fn reading(reading: &Reading) -> Result<Self, serde_json::Error> {
        Self::new(EventKind::Reading, &ReadingEvent::from(reading))
    }
}

struct HubInner {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<HubEvent>>>,
    /// Set by `close_all`; only changed while `subscribers` is locked
    closed: AtomicBool,
    buffer: usize,
}

impl HubInner {
    fn remove(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            info!("Subscriber {} left, total={}", id, subscribers.len());
        }
        removed
    }
}

/// Registry of live subscribers
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// Create a hub whose subscribers buffer at most `buffer` events
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscriber {
        self.register(None)
    }

    /// Register a new subscriber whose queue starts with `initial`
    ///
    /// The initial event gets its own slot and does not eat into the buffer.
    pub fn subscribe_with(&self, initial: HubEvent) -> Subscriber {
        self.register(Some(initial))
    }

    fn register(&self, initial: Option<HubEvent>) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.inner.buffer + 1);
        if let Some(event) = initial {
            if tx.try_send(event).is_err() {
                warn!("Failed to queue initial event for new subscriber");
            }
        }

        let id = Uuid::new_v4();
        let mut subscribers = self.inner.subscribers.lock();
        if self.inner.closed.load(Ordering::Acquire) {
            // Dropping the sender ends the stream after the initial event
            debug!("Hub closed, subscriber {} ends immediately", id);
            drop(tx);
        } else {
            subscribers.insert(id, tx);
            info!("Subscriber {} joined, total={}", id, subscribers.len());
        }

        Subscriber {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.remove(id)
    }

    /// Deliver a reading to every subscriber, evicting those that cannot keep up
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, reading: &Reading) -> usize {
        let event = match HubEvent::reading(reading) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to serialize reading from {}: {}", reading.device, e);
                return 0;
            }
        };
        self.publish_event(event)
    }

    pub fn publish_event(&self, event: HubEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|id, tx| match deliver(tx, event.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("Evicting subscriber {}: {}", id, e);
                false
            }
        });
        subscribers.len()
    }

    /// Drop every subscriber; their streams end once drained
    ///
    /// The hub stays closed: later subscribers end right after their
    /// initial event.
    pub fn close_all(&self) {
        let mut subscribers = self.inner.subscribers.lock();
        self.inner.closed.store(true, Ordering::Release);
        if !subscribers.is_empty() {
            info!("Closing {} subscribers", subscribers.len());
        }
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

fn deliver(tx: &mpsc::Sender<HubEvent>, event: HubEvent) -> Result<(), DeliveryError> {
    tx.try_send(event).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::Full,
        TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

/// Receiving end of one live stream
///
/// Dropping it unregisters it from the hub.
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<HubEvent>,
    hub: Weak<HubInner>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event; `None` once the hub dropped this subscriber
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
