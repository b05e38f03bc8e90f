//! Invocation lifecycle states and cancel reasons.

use std::fmt;

use serde::Serialize;

/// Lifecycle of one invocation.
///
/// `Created -> Running -> (Completing | Cancelling) -> Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InvocationState {
    /// Bindings constructed, script not started.
    Created = 0,
    /// Script body executing.
    Running = 1,
    /// Body returned (or a race settled); remaining tasks are being cancelled.
    Completing = 2,
    /// Cancelled by disconnect, failure, exit or the host.
    Cancelling = 3,
    /// Resources released. Terminal.
    Terminated = 4,
}

impl InvocationState {
    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Cancelling)
                | (Running, Completing)
                | (Running, Cancelling)
                | (Completing, Terminated)
                | (Cancelling, Terminated)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == InvocationState::Terminated
    }
}

impl From<u8> for InvocationState {
    fn from(v: u8) -> Self {
        match v {
            0 => InvocationState::Created,
            1 => InvocationState::Running,
            2 => InvocationState::Completing,
            3 => InvocationState::Cancelling,
            _ => InvocationState::Terminated,
        }
    }
}

/// Why an invocation entered `Cancelling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The WebSocket peer closed or stopped answering pings.
    PeerDisconnected,
    /// The body or a spawned task failed.
    ScriptFailed,
    /// The script asked to exit.
    Exit,
    /// The host is shutting down.
    HostShutdown,
    /// The HTTP timeout elapsed.
    Deadline,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::PeerDisconnected => "peer_disconnected",
            CancelReason::ScriptFailed => "script_failed",
            CancelReason::Exit => "exit",
            CancelReason::HostShutdown => "host_shutdown",
            CancelReason::Deadline => "deadline",
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
