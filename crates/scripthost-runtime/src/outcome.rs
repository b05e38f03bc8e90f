//! Results reported for a finished invocation.

use std::time::Duration;

use scripthost_protocols::ScriptError;
use serde::Serialize;

use crate::response::ResponseParts;
use crate::state::{CancelReason, InvocationState};

/// How an invocation ended.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// The body returned normally.
    Completed,
    /// Cancelled without a script failure.
    Cancelled(CancelReason),
    /// The body or a task failed.
    Failed(ScriptError),
}

impl InvocationOutcome {
    /// True when the client should receive the script's own response.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            InvocationOutcome::Completed
                | InvocationOutcome::Cancelled(CancelReason::Exit | CancelReason::PeerDisconnected)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvocationOutcome::Completed => "completed",
            InvocationOutcome::Cancelled(_) => "cancelled",
            InvocationOutcome::Failed(_) => "failed",
        }
    }
}

/// Everything the host learns from one invocation.
#[derive(Debug)]
pub struct InvocationReport {
    pub id: String,
    pub script: String,
    pub state: InvocationState,
    pub outcome: InvocationOutcome,
    pub response: ResponseParts,
    pub duration: Duration,
}

/// Coordinator counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub active: u64,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        assert!(InvocationOutcome::Completed.is_success());
        assert!(InvocationOutcome::Cancelled(CancelReason::Exit).is_success());
        assert!(!InvocationOutcome::Cancelled(CancelReason::Deadline).is_success());
        assert!(!InvocationOutcome::Failed(ScriptError::failed("x")).is_success());
    }

    #[test]
    fn test_outcome_label() {
        assert_eq!(InvocationOutcome::Completed.label(), "completed");
        assert_eq!(InvocationOutcome::Cancelled(CancelReason::HostShutdown).label(), "cancelled");
    }
}
