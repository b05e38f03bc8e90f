//! The event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use scripthost_config::EventConfig;
use scripthost_protocols::EventError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::consumer::ConsumerId;
use crate::subscription::{Subscription, SubscriptionId};
use crate::topic::{PullAttempt, Topic, validate_topic};

/// Snapshot of bus occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventStats {
    pub topics: usize,
    pub subscribers: usize,
    pub consumers: usize,
    pub published: u64,
}

struct BusInner {
    topics: DashMap<String, Arc<Topic>>,
    config: EventConfig,
    next_subscription: AtomicU64,
    clock: AtomicU64,
}

/// Process-wide publish/subscribe bus.
///
/// Cheap to clone; all clones share the same topics. Safe to use from any
/// number of execution contexts concurrently.
///
/// Topics are created on first use. The bus holds at most
/// `EventConfig::max_topics` of them: creating one more evicts the least
/// recently used topic that has no subscriber, pull cursor or waiter, and its
/// retained payloads with it. When every topic is in use the new topic is
/// refused with `TooManyTopics`. Each topic also caps its pull cursors at
/// `max_consumers_per_topic`.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(config: EventConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: DashMap::new(),
                config,
                next_subscription: AtomicU64::new(1),
                clock: AtomicU64::new(0),
            }),
        }
    }

    fn topic(&self, name: &str) -> Result<Arc<Topic>, EventError> {
        validate_topic(name)?;
        let tick = self.inner.clock.fetch_add(1, Ordering::Relaxed);
        if let Some(topic) = self.inner.topics.get(name) {
            topic.touch(tick);
            return Ok(topic.value().clone());
        }
        if self.inner.topics.len() >= self.inner.config.max_topics {
            self.evict_idle_topic()?;
        }

        let retention = self.inner.config.retention;
        let max_consumers = self.inner.config.max_consumers_per_topic;
        let topic = self
            .inner
            .topics
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(topic = %name, "Creating topic");
                Arc::new(Topic::new(name, retention, max_consumers))
            })
            .clone();
        topic.touch(tick);
        Ok(topic)
    }

    /// Remove the least recently used topic that nothing refers to.
    ///
    /// The map holds the only strong reference to an idle topic; any
    /// subscription or waiting `load`/`pull` holds another.
    fn evict_idle_topic(&self) -> Result<(), EventError> {
        let idle = |topic: &Arc<Topic>| Arc::strong_count(topic) == 1 && topic.is_unobserved();
        let victim = self
            .inner
            .topics
            .iter()
            .filter(|entry| idle(entry.value()))
            .min_by_key(|entry| entry.value().last_used())
            .map(|entry| entry.key().clone());

        let Some(name) = victim else {
            return Err(EventError::TooManyTopics {
                max: self.inner.config.max_topics,
            });
        };
        if self.inner.topics.remove_if(&name, |_, topic| idle(topic)).is_some() {
            debug!(topic = %name, "Evicted idle topic");
        }
        Ok(())
    }

    /// Publish `payload`; returns its sequence number within the topic.
    ///
    /// Never waits on subscribers. A subscriber whose backlog is full is
    /// detached instead.
    pub fn put(&self, topic: &str, payload: impl Into<String>) -> Result<u64, EventError> {
        let topic = self.topic(topic)?;
        let (seq, lagged) = topic.publish(payload.into());
        for id in lagged {
            warn!(topic = %topic.name(), subscription = %id, "Subscriber backlog full, detaching");
        }
        Ok(seq)
    }

    /// Most recent payload, waiting for the first publish if there is none.
    pub async fn load(&self, topic: &str, cancel: &CancellationToken) -> Result<String, EventError> {
        let topic = self.topic(topic)?;
        let mut published = topic.watch();
        loop {
            if let Some(payload) = topic.latest() {
                return Ok(payload);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(EventError::Cancelled),
                changed = published.changed() => changed.map_err(|_| EventError::Closed)?,
            }
        }
    }

    /// Next payload for `consumer`, waiting until one is published.
    pub async fn pull(
        &self,
        topic: &str,
        consumer: &ConsumerId,
        cancel: &CancellationToken,
    ) -> Result<String, EventError> {
        let topic = self.topic(topic)?;
        let mut published = topic.watch();
        loop {
            if let PullAttempt::Ready(payload) = topic.try_pull(consumer)? {
                return Ok(payload);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(EventError::Cancelled),
                changed = published.changed() => changed.map_err(|_| EventError::Closed)?,
            }
        }
    }

    /// [`EventBus::pull`] for a durable consumer named by the caller.
    pub async fn pull_as(
        &self,
        topic: &str,
        consumer: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EventError> {
        if consumer.trim().is_empty() {
            return Err(EventError::InvalidTopic(format!("{}: empty consumer name", topic)));
        }
        self.pull(topic, &ConsumerId::named(consumer), cancel).await
    }

    /// Register a push subscription. Does not wait.
    pub fn subscribe(&self, topic: &str) -> Result<Subscription, EventError> {
        let topic = self.topic(topic)?;
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        let lagged = Arc::new(AtomicBool::new(false));
        let rx = topic.add_subscriber(id, self.inner.config.subscriber_backlog, lagged.clone());
        debug!(topic = %topic.name(), subscription = %id, "Subscription registered");
        Ok(Subscription::new(id, topic, rx, lagged))
    }

    /// Drop every read position held by `consumer`; returns how many were removed.
    pub fn release_consumer(&self, consumer: &ConsumerId) -> usize {
        let topics: Vec<Arc<Topic>> = self.inner.topics.iter().map(|t| t.value().clone()).collect();
        let released = topics.iter().filter(|topic| topic.remove_cursor(consumer)).count();
        if released > 0 {
            debug!(consumer = %consumer, released, "Released pull consumer");
        }
        released
    }

    pub fn stats(&self) -> EventStats {
        self.inner
            .topics
            .iter()
            .fold(EventStats::default(), |mut stats, topic| {
                stats.topics += 1;
                stats.subscribers += topic.subscriber_count();
                stats.consumers += topic.consumer_count();
                stats.published += topic.published_count();
                stats
            })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventConfig::default())
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
