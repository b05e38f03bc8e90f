//! Value types of the KV store.

use std::fmt;
use std::time::Duration;

use scripthost_config::KvConfig;
use scripthost_protocols::KvError;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Opaque mutation token; changes on every successful write of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(pub(crate) u64);

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A stored entry.
#[derive(Debug, Clone)]
pub struct KvEntry {
    pub value: String,
    pub expires_at: Option<Instant>,
    pub version: Version,
}

impl KvEntry {
    /// An entry whose deadline has passed is absent to every reader.
    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| deadline > now)
    }

    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|deadline| deadline.saturating_duration_since(now))
    }
}

/// Page size policy for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default: usize,
    pub max: usize,
}

impl ListLimits {
    /// Resolve the effective page size for a request.
    pub fn resolve(&self, requested: Option<usize>) -> Result<usize, KvError> {
        match requested {
            None => Ok(self.default),
            Some(0) => Err(KvError::InvalidLimit(0)),
            Some(limit) => Ok(limit.min(self.max)),
        }
    }
}

impl Default for ListLimits {
    fn default() -> Self {
        Self::from(&KvConfig::default())
    }
}

impl From<&KvConfig> for ListLimits {
    fn from(config: &KvConfig) -> Self {
        Self {
            default: config.default_list_limit,
            max: config.max_list_limit,
        }
    }
}

/// Arguments of a `list` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ListRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// One page of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Resume token; present iff `has_next`.
    pub cursor: Option<String>,
    pub has_next: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_resolve() {
        let limits = ListLimits { default: 100, max: 1000 };
        assert_eq!(limits.resolve(None).unwrap(), 100);
        assert_eq!(limits.resolve(Some(7)).unwrap(), 7);
        assert_eq!(limits.resolve(Some(5000)).unwrap(), 1000);
        assert!(matches!(limits.resolve(Some(0)), Err(KvError::InvalidLimit(0))));
    }

    #[test]
    fn test_list_page_serializes_camel_case() {
        let page = ListPage {
            keys: vec!["a".to_string()],
            cursor: Some("c".to_string()),
            has_next: true,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasNext"], true);
        assert_eq!(json["cursor"], "c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_liveness() {
        let now = Instant::now();
        let entry = KvEntry {
            value: "v".to_string(),
            expires_at: Some(now + Duration::from_secs(1)),
            version: Version(1),
        };
        assert!(entry.is_live(now));
        assert!(!entry.is_live(now + Duration::from_secs(1)));
        assert_eq!(entry.ttl_remaining(now), Some(Duration::from_secs(1)));
    }
}
