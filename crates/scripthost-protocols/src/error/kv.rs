//! KV store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid list limit: {0}")]
    InvalidLimit(usize),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_cursor_error() {
        let err = KvError::InvalidCursor("namespace mismatch".to_string());
        let display = err.to_string();
        assert!(display.contains("Invalid cursor"));
        assert!(display.contains("namespace mismatch"));
    }

    #[test]
    fn test_storage_error() {
        let err = KvError::Storage("disk full".to_string());
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_invalid_limit_error() {
        let err = KvError::InvalidLimit(0);
        assert!(err.to_string().contains('0'));
    }
}
