//! Errors surfaced to scripts by bound calls.

use thiserror::Error;

use super::{ChannelError, EventError, KvError};

/// Classification of a script-visible failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input to a bound call.
    Validation,
    /// The connection closed or the invocation was cancelled.
    Closed,
    /// Storage or transport failure underneath a bound call.
    Fault,
    /// Failure raised by the script itself.
    Script,
}

/// Error returned from any bound call and from a script body.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Connection closed")]
    Closed,

    #[error("Invocation cancelled")]
    Cancelled,

    #[error("Script requested exit")]
    Exit,

    #[error(transparent)]
    Kv(#[from] KvError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("{0}")]
    Failed(String),
}

impl ScriptError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::Validation(_) => ErrorKind::Validation,
            ScriptError::Closed | ScriptError::Cancelled | ScriptError::Exit => ErrorKind::Closed,
            ScriptError::Kv(KvError::Storage(_)) => ErrorKind::Fault,
            ScriptError::Kv(_) => ErrorKind::Validation,
            ScriptError::Event(EventError::InvalidTopic(_)) => ErrorKind::Validation,
            ScriptError::Event(
                EventError::Lagged { .. }
                | EventError::TooManyTopics { .. }
                | EventError::TooManyConsumers { .. },
            ) => ErrorKind::Fault,
            ScriptError::Event(EventError::Closed | EventError::Cancelled) => ErrorKind::Closed,
            ScriptError::Channel(ChannelError::Closed) => ErrorKind::Closed,
            ScriptError::Channel(ChannelError::Transport(_)) => ErrorKind::Fault,
            ScriptError::Channel(_) => ErrorKind::Validation,
            ScriptError::Fetch(_) => ErrorKind::Fault,
            ScriptError::Failed(_) => ErrorKind::Script,
        }
    }

    /// True when the error only reports that the invocation is winding down.
    pub fn is_closed(&self) -> bool {
        self.kind() == ErrorKind::Closed
    }
}
