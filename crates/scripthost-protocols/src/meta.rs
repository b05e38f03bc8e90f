//! Invocation metadata.

use serde::{Deserialize, Serialize};

use crate::namespace::ScopeKind;

/// Read-only metadata describing where the running script came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Organization name.
    pub org: String,
    /// Repository name.
    pub repo: String,
    /// Commit id of the script source.
    pub commit: String,
}

impl Meta {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            commit: commit.into(),
        }
    }

    /// Tenant that owns a keyspace of the given scope.
    pub fn owner(&self, scope: ScopeKind) -> String {
        match scope {
            ScopeKind::Org => self.org.clone(),
            ScopeKind::Repo => format!("{}/{}", self.org, self.repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_per_scope() {
        let meta = Meta::new("acme", "site", "abc123");
        assert_eq!(meta.owner(ScopeKind::Org), "acme");
        assert_eq!(meta.owner(ScopeKind::Repo), "acme/site");
    }

    #[test]
    fn test_meta_serialization() {
        let meta = Meta::new("acme", "site", "abc123");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["org"], "acme");
        assert_eq!(json["repo"], "site");
        assert_eq!(json["commit"], "abc123");
    }
}
