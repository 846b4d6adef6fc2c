//! Subscriber registry for broadcast fan-out.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;
use tracing::{debug, warn};

/// Connected websocket subscribers, keyed by connection id.
///
/// Each subscriber owns an unbounded queue; a failed send means the
/// receiving task is gone, and the subscriber is dropped from the
/// registry during the same broadcast so one dead connection never
/// stalls the rest.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new subscriber, returning its id and message queue.
    pub fn add(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().insert(id, tx);
        debug!(subscriber = %id, "Subscriber registered");
        (id, rx)
    }

    pub fn remove(&self, id: Uuid) {
        if self.subscribers.lock().remove(&id).is_some() {
            debug!(subscriber = %id, "Subscriber removed");
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Send `payload` to every subscriber, pruning any whose queue is
    /// closed. Returns the number of successful deliveries.
    pub fn broadcast_all(&self, payload: &str) -> usize {
        let snapshot: Vec<(Uuid, mpsc::UnboundedSender<String>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            if tx.send(payload.to_string()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.lock();
            for id in &dead {
                subscribers.remove(id);
            }
            warn!(pruned = dead.len(), "Pruned dead subscribers");
        }

        delivered
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
