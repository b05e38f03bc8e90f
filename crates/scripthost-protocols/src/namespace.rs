//! KV namespace addressing.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KvError;
use crate::meta::Meta;

/// Owner kind of a KV keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Repo,
    Org,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Repo => "repo",
            ScopeKind::Org => "org",
        }
    }
}

/// A KV keyspace: `(scope, owner, group...)`.
///
/// Two namespaces are the same keyspace only when every component matches
/// elementwise. Namespaces are created implicitly on first use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    scope: ScopeKind,
    owner: String,
    group: Vec<String>,
}

impl Namespace {
    /// Build a namespace, trimming every group segment.
    ///
    /// Fails when no segment is given or any segment is blank.
    pub fn new<I, S>(scope: ScopeKind, owner: impl Into<String>, group: I) -> Result<Self, KvError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let group: Vec<String> = group
            .into_iter()
            .map(|segment| segment.as_ref().trim().to_string())
            .collect();

        if group.is_empty() || group.iter().any(|segment| segment.is_empty()) {
            return Err(KvError::InvalidNamespace("kv: invalid group name".to_string()));
        }

        Ok(Self {
            scope,
            owner: owner.into(),
            group,
        })
    }

    /// Repository-scoped namespace for the invocation described by `meta`.
    pub fn repo<I, S>(meta: &Meta, group: I) -> Result<Self, KvError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(ScopeKind::Repo, meta.owner(ScopeKind::Repo), group)
    }

    /// Organization-scoped namespace for the invocation described by `meta`.
    pub fn org<I, S>(meta: &Meta, group: I) -> Result<Self, KvError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(ScopeKind::Org, meta.owner(ScopeKind::Org), group)
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn group(&self) -> &[String] {
        &self.group
    }

    /// Stable short digest of the namespace, used to bind list cursors.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.scope.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.owner.as_bytes());
        for segment in &self.group {
            hasher.update([0u8]);
            hasher.update(segment.as_bytes());
        }
        hex::encode(&hasher.finalize()[..8])
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scope.as_str(), self.owner, self.group.join("/"))
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
