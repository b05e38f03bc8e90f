//! Opaque list cursors.
//!
//! A cursor encodes the namespace fingerprint, the page size and the last key
//! returned. Resuming lists keys strictly after that key, so a cursor stays
//! usable while other keys are inserted or removed.

use scripthost_protocols::{KvError, Namespace};

/// Decoded resume position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor {
    fingerprint: String,
    limit: usize,
    after: String,
}

impl ListCursor {
    pub fn new(namespace: &Namespace, limit: usize, after: impl Into<String>) -> Self {
        Self {
            fingerprint: namespace.fingerprint(),
            limit,
            after: after.into(),
        }
    }

    /// Last key of the page that issued this cursor.
    pub fn after(&self) -> &str {
        &self.after
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            self.fingerprint,
            self.limit,
            hex::encode(self.after.as_bytes())
        )
    }

    /// Decode a token and check it was issued for `namespace` and `limit`.
    pub fn decode(token: &str, namespace: &Namespace, limit: usize) -> Result<Self, KvError> {
        let mut parts = token.splitn(3, '.');
        let (Some(fingerprint), Some(raw_limit), Some(raw_after)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(KvError::InvalidCursor("malformed cursor".to_string()));
        };

        if fingerprint != namespace.fingerprint() {
            return Err(KvError::InvalidCursor(
                "cursor was issued for another namespace".to_string(),
            ));
        }

        let issued_limit: usize = raw_limit
            .parse()
            .map_err(|_| KvError::InvalidCursor("malformed cursor limit".to_string()))?;
        if issued_limit != limit {
            return Err(KvError::InvalidCursor(format!(
                "cursor was issued for limit {}, got {}",
                issued_limit, limit
            )));
        }

        let bytes = hex::decode(raw_after)
            .map_err(|_| KvError::InvalidCursor("malformed cursor position".to_string()))?;
        let after = String::from_utf8(bytes)
            .map_err(|_| KvError::InvalidCursor("malformed cursor position".to_string()))?;

        Ok(Self {
            fingerprint: fingerprint.to_string(),
            limit,
            after,
        })
    }
}
