//! A single topic: bounded log, pull cursors and push subscribers.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use scripthost_protocols::EventError;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::consumer::ConsumerId;
use crate::subscription::SubscriptionId;

/// Result of one pull attempt against the log.
pub(crate) enum PullAttempt {
    Ready(String),
    Pending,
}

pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) tx: mpsc::Sender<String>,
    pub(crate) lagged: Arc<AtomicBool>,
}

pub(crate) struct TopicState {
    /// Payloads with sequence numbers `first_seq..next_seq`.
    log: VecDeque<String>,
    first_seq: u64,
    next_seq: u64,
    /// Next sequence number each consumer will read.
    cursors: HashMap<ConsumerId, u64>,
    subscribers: Vec<Subscriber>,
}

pub(crate) struct Topic {
    name: String,
    retention: usize,
    max_consumers: usize,
    /// Bus clock value of the last access, for eviction order.
    last_used: AtomicU64,
    state: Mutex<TopicState>,
    /// Carries `next_seq`; bumped on every publish to wake waiters.
    published: watch::Sender<u64>,
}

impl Topic {
    pub(crate) fn new(name: impl Into<String>, retention: usize, max_consumers: usize) -> Self {
        let (published, _) = watch::channel(0);
        Self {
            name: name.into(),
            retention: retention.max(1),
            max_consumers: max_consumers.max(1),
            last_used: AtomicU64::new(0),
            state: Mutex::new(TopicState {
                log: VecDeque::new(),
                first_seq: 0,
                next_seq: 0,
                cursors: HashMap::new(),
                subscribers: Vec::new(),
            }),
            published,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn touch(&self, tick: u64) {
        self.last_used.fetch_max(tick, Ordering::Relaxed);
    }

    pub(crate) fn last_used(&self) -> u64 {
        self.last_used.load(Ordering::Relaxed)
    }

    /// No push subscriber and no pull cursor refers to this topic.
    pub(crate) fn is_unobserved(&self) -> bool {
        let state = self.state.lock();
        state.subscribers.is_empty() && state.cursors.is_empty()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.published.subscribe()
    }

    /// Append `payload` and fan it out to push subscribers.
    ///
    /// Returns the sequence number and the subscribers detached for lagging.
    pub(crate) fn publish(&self, payload: String) -> (u64, Vec<SubscriptionId>) {
        let mut state = self.state.lock();
        let seq = state.next_seq;

        let mut lagged = Vec::new();
        state.subscribers.retain(|sub| match sub.tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                sub.lagged.store(true, Ordering::Release);
                lagged.push(sub.id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        state.log.push_back(payload);
        state.next_seq += 1;
        while state.log.len() > self.retention {
            state.log.pop_front();
            state.first_seq += 1;
        }

        let next_seq = state.next_seq;
        drop(state);
        self.published.send_replace(next_seq);
        (seq, lagged)
    }

    pub(crate) fn latest(&self) -> Option<String> {
        self.state.lock().log.back().cloned()
    }

    /// Take the next payload for `consumer`, if one is retained.
    ///
    /// A consumer seen for the first time starts at the current tail.
    pub(crate) fn try_pull(&self, consumer: &ConsumerId) -> Result<PullAttempt, EventError> {
        let mut state = self.state.lock();
        let TopicState {
            log,
            first_seq,
            next_seq,
            cursors,
            ..
        } = &mut *state;

        let known = cursors.len();
        let cursor = match cursors.entry(consumer.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if known >= self.max_consumers {
                    return Err(EventError::TooManyConsumers {
                        topic: self.name.clone(),
                        max: self.max_consumers,
                    });
                }
                entry.insert(*next_seq)
            }
        };
        if *cursor < *first_seq {
            warn!(
                topic = %self.name,
                consumer = %consumer,
                skipped = *first_seq - *cursor,
                "Pull consumer fell behind retained log, skipping forward"
            );
            *cursor = *first_seq;
        }
        if *cursor >= *next_seq {
            return Ok(PullAttempt::Pending);
        }

        let index = (*cursor - *first_seq) as usize;
        *cursor += 1;
        Ok(match log.get(index) {
            Some(payload) => PullAttempt::Ready(payload.clone()),
            None => PullAttempt::Pending,
        })
    }

    pub(crate) fn add_subscriber(
        &self,
        id: SubscriptionId,
        backlog: usize,
        lagged: Arc<AtomicBool>,
    ) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(backlog.max(1));
        self.state.lock().subscribers.push(Subscriber { id, tx, lagged });
        rx
    }

    pub(crate) fn remove_subscriber(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|sub| sub.id != id);
        state.subscribers.len() != before
    }

    pub(crate) fn remove_cursor(&self, consumer: &ConsumerId) -> bool {
        self.state.lock().cursors.remove(consumer).is_some()
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    pub(crate) fn consumer_count(&self) -> usize {
        self.state.lock().cursors.len()
    }

    pub(crate) fn published_count(&self) -> u64 {
        self.state.lock().next_seq
    }
}

/// Topic names are non-blank strings.
pub(crate) fn validate_topic(topic: &str) -> Result<(), EventError> {
    if topic.trim().is_empty() {
        return Err(EventError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_drops_oldest() {
        let topic = Topic::new("t", 2, 16);
        for p in ["a", "b", "c"] {
            topic.publish(p.to_string());
        }
        let state = topic.state.lock();
        assert_eq!(state.log, VecDeque::from(vec!["b".to_string(), "c".to_string()]));
        assert_eq!(state.first_seq, 1);
        assert_eq!(state.next_seq, 3);
    }

    #[test]
    fn test_new_consumer_starts_at_tail() {
        let topic = Topic::new("t", 8, 16);
        topic.publish("old".to_string());
        let consumer = ConsumerId::context("c1");
        assert!(matches!(topic.try_pull(&consumer).unwrap(), PullAttempt::Pending));

        topic.publish("new".to_string());
        match topic.try_pull(&consumer).unwrap() {
            PullAttempt::Ready(payload) => assert_eq!(payload, "new"),
            PullAttempt::Pending => panic!("expected payload"),
        }
    }

    #[test]
    fn test_lagging_consumer_skips_forward() {
        let topic = Topic::new("t", 2, 16);
        let consumer = ConsumerId::named("w");
        assert!(matches!(topic.try_pull(&consumer).unwrap(), PullAttempt::Pending));
        for p in ["a", "b", "c", "d"] {
            topic.publish(p.to_string());
        }
        match topic.try_pull(&consumer).unwrap() {
            PullAttempt::Ready(payload) => assert_eq!(payload, "c"),
            PullAttempt::Pending => panic!("expected payload"),
        }
    }

    #[test]
    fn test_full_subscriber_is_detached() {
        let topic = Topic::new("t", 8, 16);
        let id = SubscriptionId(1);
        let flag = Arc::new(AtomicBool::new(false));
        let _rx = topic.add_subscriber(id, 1, flag.clone());
        let (_, lagged) = topic.publish("a".to_string());
        assert!(lagged.is_empty());
        let (_, lagged) = topic.publish("b".to_string());
        assert_eq!(lagged, vec![id]);
        assert!(flag.load(Ordering::Acquire));
        assert_eq!(topic.subscriber_count(), 0);
    }

    #[test]
    fn test_consumer_limit() {
        let topic = Topic::new("t", 8, 2);
        for name in ["a", "b"] {
            assert!(topic.try_pull(&ConsumerId::named(name)).is_ok());
        }
        assert!(matches!(
            topic.try_pull(&ConsumerId::named("c")),
            Err(EventError::TooManyConsumers { max: 2, .. })
        ));
        // Known consumers keep reading.
        assert!(topic.try_pull(&ConsumerId::named("a")).is_ok());
        assert!(topic.remove_cursor(&ConsumerId::named("b")));
        assert!(topic.try_pull(&ConsumerId::named("c")).is_ok());
    }

    #[test]
    fn test_validate_topic() {
        assert!(validate_topic("chat").is_ok());
        assert!(validate_topic("  ").is_err());
    }
}
