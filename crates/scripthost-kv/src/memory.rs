//! In-process KV store.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use scripthost_protocols::{KvError, Namespace};
use tokio::time::Instant;
use tracing::debug;

use crate::cursor::ListCursor;
use crate::store::KvStore;
use crate::types::{KvEntry, ListLimits, ListPage, ListRequest, Version};

type Keyspace = BTreeMap<String, KvEntry>;

/// KV store kept in memory.
///
/// Each namespace owns an ordered keyspace behind its own lock, so
/// operations on different namespaces never contend and every single-key
/// operation is linearizable.
pub struct MemoryKvStore {
    spaces: DashMap<Namespace, Arc<Mutex<Keyspace>>>,
    next_version: AtomicU64,
    limits: ListLimits,
}

impl MemoryKvStore {
    /// Create a store with default list limits.
    pub fn new() -> Self {
        Self::with_limits(ListLimits::default())
    }

    pub fn with_limits(limits: ListLimits) -> Self {
        Self {
            spaces: DashMap::new(),
            next_version: AtomicU64::new(1),
            limits,
        }
    }

    /// Number of namespaces touched so far.
    pub fn namespace_count(&self) -> usize {
        self.spaces.len()
    }

    fn bump_version(&self) -> Version {
        Version(self.next_version.fetch_add(1, Ordering::Relaxed))
    }

    fn existing(&self, namespace: &Namespace) -> Option<Arc<Mutex<Keyspace>>> {
        self.spaces.get(namespace).map(|space| space.value().clone())
    }

    fn space(&self, namespace: &Namespace) -> Arc<Mutex<Keyspace>> {
        if let Some(space) = self.existing(namespace) {
            return space;
        }
        self.spaces
            .entry(namespace.clone())
            .or_insert_with(|| {
                debug!(namespace = %namespace, "Creating KV namespace");
                Arc::new(Mutex::new(BTreeMap::new()))
            })
            .clone()
    }

    fn new_entry(&self, value: String, ttl: Option<Duration>, now: Instant) -> KvEntry {
        KvEntry {
            value,
            expires_at: ttl.map(|ttl| now + ttl),
            version: self.bump_version(),
        }
    }

    /// Live entry for `key`, dropping it when it has expired.
    fn live<'a>(space: &'a mut Keyspace, key: &str, now: Instant) -> Option<&'a mut KvEntry> {
        if space.get(key).is_some_and(|entry| !entry.is_live(now)) {
            space.remove(key);
            return None;
        }
        space.get_mut(key)
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<String>, KvError> {
        Ok(self
            .entry(namespace, key)
            .await?
            .map(|entry| entry.value))
    }

    async fn entry(&self, namespace: &Namespace, key: &str) -> Result<Option<KvEntry>, KvError> {
        let Some(space) = self.existing(namespace) else {
            return Ok(None);
        };
        let mut space = space.lock();
        Ok(Self::live(&mut space, key, Instant::now()).map(|entry| entry.clone()))
    }

    async fn set(
        &self,
        namespace: &Namespace,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), KvError> {
        let space = self.space(namespace);
        let entry = self.new_entry(value, ttl, Instant::now());
        space.lock().insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, KvError> {
        let Some(space) = self.existing(namespace) else {
            return Ok(false);
        };
        let mut space = space.lock();
        let removed = space.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn put_if_not_exists(
        &self,
        namespace: &Namespace,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, KvError> {
        let space = self.space(namespace);
        let mut space = space.lock();
        let now = Instant::now();
        if Self::live(&mut space, key, now).is_some() {
            return Ok(false);
        }
        let entry = self.new_entry(value, ttl, now);
        space.insert(key.to_string(), entry);
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        namespace: &Namespace,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> Result<bool, KvError> {
        let space = self.space(namespace);
        let mut space = space.lock();
        let now = Instant::now();

        match (Self::live(&mut space, key, now), expected) {
            (Some(current), Some(expected)) if current.value == expected => {
                current.value = value;
                current.version = self.bump_version();
                Ok(true)
            }
            (None, None) => {
                let entry = self.new_entry(value, None, now);
                space.insert(key.to_string(), entry);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, namespace: &Namespace, request: ListRequest) -> Result<ListPage, KvError> {
        let limit = self.limits.resolve(request.limit)?;
        let after = match request.cursor.as_deref() {
            Some(token) if !token.is_empty() => {
                Some(ListCursor::decode(token, namespace, limit)?.after().to_string())
            }
            _ => None,
        };

        let Some(space) = self.existing(namespace) else {
            return Ok(ListPage::default());
        };
        let space = space.lock();
        let now = Instant::now();

        let lower = match after.as_deref() {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };
        let mut live = space
            .range::<str, _>((lower, Bound::Unbounded))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key);

        let keys: Vec<String> = live.by_ref().take(limit).cloned().collect();
        let has_next = live.next().is_some();
        let cursor = match keys.last() {
            Some(last) if has_next => Some(ListCursor::new(namespace, limit, last.as_str()).encode()),
            _ => None,
        };

        Ok(ListPage {
            keys,
            cursor,
            has_next,
        })
    }

    async fn sweep_expired(&self) -> Result<usize, KvError> {
        let spaces: Vec<Arc<Mutex<Keyspace>>> =
            self.spaces.iter().map(|entry| entry.value().clone()).collect();
        let now = Instant::now();

        let mut reclaimed = 0;
        for space in spaces {
            let mut space = space.lock();
            let before = space.len();
            space.retain(|_, entry| entry.is_live(now));
            reclaimed += before - space.len();
        }

        if reclaimed > 0 {
            debug!(reclaimed, "Swept expired KV entries");
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
