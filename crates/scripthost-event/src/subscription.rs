//! Push-mode subscriptions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scripthost_protocols::EventError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::topic::Topic;

/// Identifier of a push subscription, unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving end of a push subscription.
///
/// Receives every payload published to the topic after registration, in
/// publish order. Dropping the subscription unregisters it.
pub struct Subscription {
    id: SubscriptionId,
    topic: Arc<Topic>,
    rx: mpsc::Receiver<String>,
    lagged: Arc<AtomicBool>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: Arc<Topic>,
        rx: mpsc::Receiver<String>,
        lagged: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            topic,
            rx,
            lagged,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &str {
        self.topic.name()
    }

    /// Next payload.
    ///
    /// Payloads queued before a detachment are still delivered; after that
    /// the call fails with `Lagged`.
    pub async fn recv(&mut self) -> Result<String, EventError> {
        match self.rx.recv().await {
            Some(payload) => Ok(payload),
            None if self.lagged.load(Ordering::Acquire) => Err(EventError::Lagged {
                topic: self.topic.name().to_string(),
            }),
            None => Err(EventError::Closed),
        }
    }

    pub fn is_lagged(&self) -> bool {
        self.lagged.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.topic.remove_subscriber(self.id) {
            debug!(topic = %self.topic.name(), subscription = %self.id, "Subscription released");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic.name())
            .finish()
    }
}
