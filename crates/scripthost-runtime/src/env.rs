//! The environment a script runs in.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, select_all, try_join_all};
use scripthost_protocols::{Meta, ScriptError};
use tokio::sync::oneshot;

use crate::bindings::{Console, EventBinding, FetchRequest, FetchResponse, Fetcher, KvBinding, WebSocketBinding};
use crate::context::ExecutionContext;
use crate::request::ScriptRequest;
use crate::response::ScriptResponse;
use crate::state::{CancelReason, InvocationState};

pub(crate) struct EnvParts {
    pub(crate) context: ExecutionContext,
    pub(crate) request: ScriptRequest,
    pub(crate) response: ScriptResponse,
    pub(crate) kv: KvBinding,
    pub(crate) event: EventBinding,
    pub(crate) websocket: Option<WebSocketBinding>,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) meta: Meta,
    pub(crate) console: Console,
}

/// Bindings of one invocation.
///
/// Cheap to clone; clones share the invocation. Every suspending call fails
/// fast with `Cancelled` once the invocation is cancelled.
#[derive(Clone)]
pub struct ScriptEnv {
    inner: Arc<EnvParts>,
}

impl ScriptEnv {
    pub(crate) fn new(parts: EnvParts) -> Self {
        Self {
            inner: Arc::new(parts),
        }
    }

    pub fn invocation_id(&self) -> &str {
        self.inner.context.id()
    }

    pub fn request(&self) -> &ScriptRequest {
        &self.inner.request
    }

    pub fn response(&self) -> &ScriptResponse {
        &self.inner.response
    }

    pub fn kv(&self) -> &KvBinding {
        &self.inner.kv
    }

    pub fn event(&self) -> &EventBinding {
        &self.inner.event
    }

    /// The invocation's connection; the same channel on every call.
    pub fn websocket(&self) -> Result<WebSocketBinding, ScriptError> {
        self.inner.context.ensure_active()?;
        self.inner
            .websocket
            .clone()
            .ok_or(ScriptError::Channel(scripthost_protocols::ChannelError::Unavailable))
    }

    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ScriptError> {
        self.inner.context.guard(self.inner.fetcher.fetch(request)).await
    }

    pub fn meta(&self) -> &Meta {
        &self.inner.meta
    }

    pub fn console(&self) -> &Console {
        &self.inner.console
    }

    pub fn is_active(&self) -> bool {
        self.inner.context.is_active()
    }

    pub fn state(&self) -> InvocationState {
        self.inner.context.state()
    }

    /// Run `future` alongside the body on this invocation's schedule.
    ///
    /// A task that fails fails the whole invocation. Tasks still running
    /// when the body returns are cancelled.
    pub fn spawn<F, T>(&self, name: impl Into<String>, future: F) -> Result<TaskHandle<T>, ScriptError>
    where
        F: Future<Output = Result<T, ScriptError>> + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let (tx, rx) = oneshot::channel();

        let task = async move {
            match future.await {
                Ok(value) => {
                    let _ = tx.send(Ok(value));
                    Ok(())
                }
                Err(e) => {
                    let forwarded = if e.is_closed() {
                        ScriptError::Cancelled
                    } else {
                        ScriptError::failed(format!("task {} failed: {}", task_name, e))
                    };
                    let _ = tx.send(Err(forwarded));
                    Err(e)
                }
            }
        };

        self.inner.context.schedule(name, task.boxed())?;
        Ok(TaskHandle { rx })
    }

    /// Run `futures` together until the first one finishes; the rest are
    /// cancelled. Returns the winner's index and value.
    pub async fn race<'a, T>(
        &self,
        futures: Vec<BoxFuture<'a, Result<T, ScriptError>>>,
    ) -> Result<(usize, T), ScriptError> {
        if futures.is_empty() {
            return Err(ScriptError::validation("race: no tasks given"));
        }
        let race = select_all(futures).map(|(result, index, losers)| {
            drop(losers);
            result.map(|value| (index, value))
        });
        self.inner.context.guard(race).await
    }

    /// Run `futures` together until all finish. The first error cancels the rest.
    pub async fn join_all<'a, T>(
        &self,
        futures: Vec<BoxFuture<'a, Result<T, ScriptError>>>,
    ) -> Result<Vec<T>, ScriptError> {
        self.inner.context.guard(try_join_all(futures)).await
    }

    /// Request termination; return the result from the body:
    /// `return Err(env.exit())`.
    pub fn exit(&self) -> ScriptError {
        self.inner.context.cancel(CancelReason::Exit);
        ScriptError::Exit
    }
}

/// Awaitable result of [`ScriptEnv::spawn`].
///
/// Resolves to `Cancelled` if the task was dropped before finishing.
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<Result<T, ScriptError>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, ScriptError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ScriptError::Cancelled)))
    }
}
