//! Pull consumer identities.

use std::fmt;

/// Owner of a `pull` read position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConsumerId {
    /// Anonymous consumer scoped to one execution context.
    Context(String),
    /// Durable consumer chosen by the script; survives across invocations.
    Named(String),
}

impl ConsumerId {
    pub fn context(id: impl Into<String>) -> Self {
        Self::Context(id.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context(id) => write!(f, "context:{}", id),
            Self::Named(name) => write!(f, "named:{}", name),
        }
    }
}
