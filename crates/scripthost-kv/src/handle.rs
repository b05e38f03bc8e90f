//! Namespace-bound KV handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use scripthost_protocols::{KvError, Namespace};

use crate::store::KvStore;
use crate::types::{ListPage, ListRequest};

/// A store bound to one namespace.
///
/// This is the object scripts receive from `kv.repo(...)` and `kv.org(...)`.
/// Cloning is cheap and every clone addresses the same keyspace.
#[derive(Clone)]
pub struct KvNamespace {
    store: Arc<dyn KvStore>,
    namespace: Namespace,
}

impl KvNamespace {
    pub fn new(store: Arc<dyn KvStore>, namespace: Namespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.store.get(&self.namespace, key).await
    }

    pub async fn set(&self, key: &str, value: impl Into<String>) -> Result<(), KvError> {
        self.store.set(&self.namespace, key, value.into(), None).await
    }

    /// Upsert with an expiry; `Duration::ZERO` stores an already-expired entry.
    pub async fn set_with_ttl(
        &self,
        key: &str,
        value: impl Into<String>,
        ttl: Duration,
    ) -> Result<(), KvError> {
        self.store
            .set(&self.namespace, key, value.into(), Some(ttl))
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<bool, KvError> {
        self.store.delete(&self.namespace, key).await
    }

    pub async fn put_if_not_exists(
        &self,
        key: &str,
        value: impl Into<String>,
    ) -> Result<bool, KvError> {
        self.store
            .put_if_not_exists(&self.namespace, key, value.into(), None)
            .await
    }

    pub async fn put_if_not_exists_with_ttl(
        &self,
        key: &str,
        value: impl Into<String>,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        self.store
            .put_if_not_exists(&self.namespace, key, value.into(), Some(ttl))
            .await
    }

    /// Swap `key` to `value` iff it currently holds `expected` (`None`: absent).
    pub async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: impl Into<String>,
    ) -> Result<bool, KvError> {
        self.store
            .compare_and_swap(&self.namespace, key, expected, value.into())
            .await
    }

    pub async fn list(&self, request: ListRequest) -> Result<ListPage, KvError> {
        self.store.list(&self.namespace, request).await
    }
}

impl fmt::Debug for KvNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KvNamespace")
            .field("store", &self.store.id())
            .field("namespace", &self.namespace.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use scripthost_protocols::Meta;

    #[tokio::test]
    async fn test_handles_share_keyspace() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let meta = Meta::new("acme", "site", "abc");
        let a = KvNamespace::new(store.clone(), Namespace::repo(&meta, ["counter"]).unwrap());
        let b = KvNamespace::new(store.clone(), Namespace::repo(&meta, [" counter "]).unwrap());
        let org = KvNamespace::new(store, Namespace::org(&meta, ["counter"]).unwrap());

        a.set("n", "1").await.unwrap();
        assert_eq!(b.get("n").await.unwrap().as_deref(), Some("1"));
        assert_eq!(org.get("n").await.unwrap(), None);
    }
}
