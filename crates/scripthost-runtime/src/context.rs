//! Per-invocation execution context.

use std::future::Future;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use futures::future::BoxFuture;
use scripthost_protocols::ScriptError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::state::{CancelReason, InvocationState};

/// A unit of work scheduled onto a context's cooperative loop.
pub(crate) struct ScheduledTask {
    pub(crate) name: String,
    pub(crate) future: BoxFuture<'static, Result<(), ScriptError>>,
}

struct ContextInner {
    id: String,
    script: String,
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
    state: AtomicU8,
    tasks: mpsc::UnboundedSender<ScheduledTask>,
}

/// Cancellation, lifecycle state and task intake of one invocation.
///
/// Every bound call checks [`ExecutionContext::ensure_active`] first and
/// races its suspension against the context token.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    pub(crate) fn new(
        id: impl Into<String>,
        script: impl Into<String>,
        token: CancellationToken,
    ) -> (Self, mpsc::UnboundedReceiver<ScheduledTask>) {
        let (tasks, rx) = mpsc::unbounded_channel();
        let context = Self {
            inner: Arc::new(ContextInner {
                id: id.into(),
                script: script.into(),
                token,
                reason: OnceLock::new(),
                state: AtomicU8::new(InvocationState::Created as u8),
                tasks,
            }),
        };
        (context, rx)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn script(&self) -> &str {
        &self.inner.script
    }

    pub fn state(&self) -> InvocationState {
        InvocationState::from(self.inner.state.load(Ordering::Acquire))
    }

    pub(crate) fn transition(&self, next: InvocationState) -> bool {
        let mut current = self.state();
        loop {
            if !current.can_transition_to(next) {
                error!(
                    invocation_id = %self.id(),
                    "Invalid invocation transition {:?} -> {:?}", current, next
                );
                return false;
            }
            match self.inner.state.compare_exchange(
                current as u8,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    debug!(invocation_id = %self.id(), "Invocation {:?} -> {:?}", current, next);
                    return true;
                }
                Err(actual) => current = InvocationState::from(actual),
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !self.inner.token.is_cancelled()
    }

    /// Fail fast once the context is cancelled.
    pub fn ensure_active(&self) -> Result<(), ScriptError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ScriptError::Cancelled)
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Cancel with `reason`; the first reason recorded wins.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        let first = self.inner.reason.set(reason).is_ok();
        if first {
            debug!(invocation_id = %self.id(), reason = %reason, "Cancelling invocation");
        }
        self.inner.token.cancel();
        first
    }

    /// Recorded reason; a cancelled context without one was cancelled by the host.
    pub fn reason(&self) -> Option<CancelReason> {
        match self.inner.reason.get() {
            Some(reason) => Some(*reason),
            None if self.inner.token.is_cancelled() => Some(CancelReason::HostShutdown),
            None => None,
        }
    }

    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }

    /// Run `op` unless the context is, or becomes, cancelled.
    pub async fn guard<T, E>(&self, op: impl Future<Output = Result<T, E>>) -> Result<T, ScriptError>
    where
        ScriptError: From<E>,
    {
        self.ensure_active()?;
        tokio::select! {
            biased;
            _ = self.inner.token.cancelled() => Err(ScriptError::Cancelled),
            result = op => result.map_err(ScriptError::from),
        }
    }

    /// Hand a task to the context's loop.
    pub(crate) fn schedule(
        &self,
        name: impl Into<String>,
        future: BoxFuture<'static, Result<(), ScriptError>>,
    ) -> Result<(), ScriptError> {
        self.ensure_active()?;
        self.inner
            .tasks
            .send(ScheduledTask {
                name: name.into(),
                future,
            })
            .map_err(|_| ScriptError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[test]
    fn test_transitions_follow_state_machine() {
        let (ctx, _rx) = ExecutionContext::new("id", "s", CancellationToken::new());
        assert_eq!(ctx.state(), InvocationState::Created);
        assert!(ctx.transition(InvocationState::Running));
        assert!(!ctx.transition(InvocationState::Created));
        assert!(ctx.transition(InvocationState::Completing));
        assert!(ctx.transition(InvocationState::Terminated));
        assert!(!ctx.transition(InvocationState::Running));
    }

    #[test]
    fn test_first_cancel_reason_wins() {
        let (ctx, _rx) = ExecutionContext::new("id", "s", CancellationToken::new());
        assert!(ctx.ensure_active().is_ok());
        assert!(ctx.cancel(CancelReason::Exit));
        assert!(!ctx.cancel(CancelReason::ScriptFailed));
        assert_eq!(ctx.reason(), Some(CancelReason::Exit));
        assert!(matches!(ctx.ensure_active(), Err(ScriptError::Cancelled)));
    }

    #[test]
    fn test_parent_cancel_reads_as_host_shutdown() {
        let root = CancellationToken::new();
        let (ctx, _rx) = ExecutionContext::new("id", "s", root.child_token());
        assert_eq!(ctx.reason(), None);
        root.cancel();
        assert_eq!(ctx.reason(), Some(CancelReason::HostShutdown));
    }

    #[tokio::test]
    async fn test_guard_unblocks_on_cancel() {
        let (ctx, _rx) = ExecutionContext::new("id", "s", CancellationToken::new());
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                ctx.guard(futures::future::pending::<Result<(), ScriptError>>())
                    .await
            })
        };
        tokio::task::yield_now().await;
        ctx.cancel(CancelReason::PeerDisconnected);
        assert!(matches!(waiter.await.unwrap(), Err(ScriptError::Cancelled)));
    }

    #[tokio::test]
    async fn test_schedule_after_cancel_fails() {
        let (ctx, mut rx) = ExecutionContext::new("id", "s", CancellationToken::new());
        ctx.schedule("a", async { Ok(()) }.boxed()).unwrap();
        assert_eq!(rx.recv().await.map(|t| t.name), Some("a".to_string()));

        ctx.cancel(CancelReason::Exit);
        assert!(ctx.schedule("b", async { Ok(()) }.boxed()).is_err());
    }
}
