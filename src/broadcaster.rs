//! Live-feed fanout
//!
//! Keeps the set of currently connected viewers and pushes JSON envelopes
//! to all of them. Delivery is at-most-once and best-effort: no queue, no
//! history, no replay. A viewer whose channel is gone is pruned during the
//! broadcast and never affects delivery to the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::Reading;
use crate::evaluator::AlertEvent;

/// Envelopes pushed to every connected live viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    #[serde(rename = "sensor:update")]
    SensorUpdate { data: Reading },

    #[serde(rename = "alert")]
    Alert { alert: AlertEvent },
}

pub type SubscriberId = usize;

/// Fanout hub for live viewers.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: RwLock<HashMap<SubscriberId, UnboundedSender<String>>>,
    next_id: AtomicUsize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer; the returned receiver yields serialized frames.
    pub async fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscribers.write().await.insert(id, tx);
        debug!("live viewer {id} connected");

        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.write().await.remove(&id).is_some() {
            debug!("live viewer {id} disconnected");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Serialize once and write to every currently-open viewer.
    ///
    /// A failed write means the viewer's receiving end is gone; that
    /// viewer is dropped from the set and the remaining viewers still get
    /// the frame.
    pub async fn broadcast(&self, message: &LiveMessage) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to serialize live message: {e}");
                return;
            }
        };

        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|id, tx| match tx.send(frame.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!("live viewer {id} unreachable, dropping");
                false
            }
        });

        trace!("broadcast frame to {} viewers", subscribers.len());
    }
}
