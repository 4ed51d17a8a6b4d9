// src/engine/notifier.rs

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::dag::OrderedProjectSet;

/// Default number of unread results a slow subscriber may lag behind.
pub const DEFAULT_CAPACITY: usize = 16;

/// Publishes each finished project order to every current subscriber.
///
/// Late subscribers see only what is published after they subscribed.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<Arc<OrderedProjectSet>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier {
    /// `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OrderedProjectSet>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Returns how many subscribers the value was delivered to. Having
    /// none is not an error.
    pub fn publish(&self, projects: Arc<OrderedProjectSet>) -> usize {
        let delivered = self.tx.send(projects).unwrap_or(0);
        debug!(subscribers = delivered, "published project order");
        delivered
    }
}
