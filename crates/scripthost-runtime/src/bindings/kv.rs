//! `kv.repo(...)` / `kv.org(...)`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scripthost_kv::{KvNamespace, KvStore, ListPage, ListRequest};
use scripthost_protocols::{Meta, Namespace, ScriptError};

use crate::context::ExecutionContext;

/// The `kv` binding of one invocation.
///
/// Handles are cached per namespace for the lifetime of the invocation.
#[derive(Clone)]
pub struct KvBinding {
    store: Arc<dyn KvStore>,
    meta: Meta,
    context: ExecutionContext,
    handles: Arc<Mutex<HashMap<Namespace, ScopedKv>>>,
}

impl KvBinding {
    pub(crate) fn new(store: Arc<dyn KvStore>, meta: Meta, context: ExecutionContext) -> Self {
        Self {
            store,
            meta,
            context,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Keyspace shared by every script of the current repository.
    pub fn repo<I, S>(&self, group: I) -> Result<ScopedKv, ScriptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bind(Namespace::repo(&self.meta, group)?)
    }

    /// Keyspace shared by every repository of the current organization.
    pub fn org<I, S>(&self, group: I) -> Result<ScopedKv, ScriptError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bind(Namespace::org(&self.meta, group)?)
    }

    fn bind(&self, namespace: Namespace) -> Result<ScopedKv, ScriptError> {
        self.context.ensure_active()?;
        let mut handles = self.handles.lock();
        let handle = handles.entry(namespace.clone()).or_insert_with(|| ScopedKv {
            inner: KvNamespace::new(self.store.clone(), namespace),
            context: self.context.clone(),
        });
        Ok(handle.clone())
    }

    /// Namespaces bound so far.
    pub fn bound_namespaces(&self) -> usize {
        self.handles.lock().len()
    }
}

/// KV operations on one namespace, tied to the invocation's lifetime.
#[derive(Clone)]
pub struct ScopedKv {
    inner: KvNamespace,
    context: ExecutionContext,
}

impl ScopedKv {
    pub fn namespace(&self) -> &Namespace {
        self.inner.namespace()
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, ScriptError> {
        self.context.guard(self.inner.get(key)).await
    }

    /// Upsert; `ttl` of `None` clears any previous expiry.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), ScriptError> {
        match ttl {
            Some(ttl) => self.context.guard(self.inner.set_with_ttl(key, value, ttl)).await,
            None => self.context.guard(self.inner.set(key, value)).await,
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool, ScriptError> {
        self.context.guard(self.inner.delete(key)).await
    }

    pub async fn put_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, ScriptError> {
        match ttl {
            Some(ttl) => {
                self.context
                    .guard(self.inner.put_if_not_exists_with_ttl(key, value, ttl))
                    .await
            }
            None => self.context.guard(self.inner.put_if_not_exists(key, value)).await,
        }
    }

    pub async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, ScriptError> {
        self.context
            .guard(self.inner.compare_and_swap(key, expected, value))
            .await
    }

    pub async fn list(&self, limit: Option<usize>, cursor: Option<&str>) -> Result<ListPage, ScriptError> {
        let request = ListRequest {
            limit,
            cursor: cursor.map(str::to_string),
        };
        self.context.guard(self.inner.list(request)).await
    }
}
