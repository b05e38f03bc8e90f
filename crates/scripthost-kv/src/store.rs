//! KV store trait.

use std::time::Duration;

use async_trait::async_trait;
use scripthost_protocols::{KvError, Namespace};

use crate::types::{KvEntry, ListPage, ListRequest};

/// Backend for namespaced key-value storage.
///
/// Every single-key operation is atomic. No cross-key transactions are
/// offered; read-modify-write is built on [`KvStore::compare_and_swap`].
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the backend ID.
    fn id(&self) -> &str;

    /// Live value of `key`, or `None` when missing or expired.
    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<String>, KvError>;

    /// Live entry of `key`, including its version.
    async fn entry(&self, namespace: &Namespace, key: &str) -> Result<Option<KvEntry>, KvError>;

    /// Unconditional upsert. Any previous TTL is replaced by `ttl`.
    async fn set(
        &self,
        namespace: &Namespace,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), KvError>;

    /// Remove `key`; true when a live entry was removed.
    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<bool, KvError>;

    /// Create `key` only when no live entry exists.
    async fn put_if_not_exists(
        &self,
        namespace: &Namespace,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, KvError>;

    /// Replace the value of `key` only when it currently equals `expected`.
    ///
    /// `expected = None` means "the key must be absent". The entry keeps its
    /// TTL on success.
    async fn compare_and_swap(
        &self,
        namespace: &Namespace,
        key: &str,
        expected: Option<&str>,
        value: String,
    ) -> Result<bool, KvError>;

    /// One page of live keys in lexicographic order.
    async fn list(&self, namespace: &Namespace, request: ListRequest) -> Result<ListPage, KvError>;

    /// Physically remove expired entries; returns how many were reclaimed.
    async fn sweep_expired(&self) -> Result<usize, KvError>;
}
