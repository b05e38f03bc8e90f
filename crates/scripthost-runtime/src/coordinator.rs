//! Invocation coordinator.
//!
//! Drives one script invocation per call to [`InvocationCoordinator::invoke`]:
//! the body and every task it spawns run cooperatively on the caller's task,
//! and the first cancellation cause (exit, failure, peer loss, deadline or
//! host shutdown) stops all of them together.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use scripthost_config::Config;
use scripthost_event::{ConsumerId, EventBus};
use scripthost_kv::KvStore;
use scripthost_protocols::{ChannelError, Meta, ScriptError};
use scripthost_websocket::{WebSocketChannel, spawn_keepalive};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::bindings::{Console, EventBinding, Fetcher, KvBinding, WebSocketBinding};
use crate::context::{ExecutionContext, ScheduledTask};
use crate::env::{EnvParts, ScriptEnv};
use crate::outcome::{CoordinatorStats, InvocationOutcome, InvocationReport};
use crate::request::ScriptRequest;
use crate::response::ScriptResponse;
use crate::script::Script;
use crate::state::{CancelReason, InvocationState};

const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(1);

/// Coordinator tuning.
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// How long a cancelled body and its tasks may keep running to observe
    /// the cancellation before they are dropped.
    pub cancel_grace: Duration,
    /// Keep-alive ping interval for WebSocket invocations.
    pub ping_interval: Option<Duration>,
    pub ping_timeout: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            cancel_grace: DEFAULT_CANCEL_GRACE,
            ping_interval: Some(Duration::from_secs(15)),
            ping_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&Config> for CoordinatorOptions {
    fn from(config: &Config) -> Self {
        Self {
            cancel_grace: DEFAULT_CANCEL_GRACE,
            ping_interval: config.websocket.ping_interval(),
            ping_timeout: config.websocket.ping_timeout(),
        }
    }
}

/// One invocation to run.
pub struct InvocationRequest {
    pub script: Arc<dyn Script>,
    pub meta: Meta,
    pub request: ScriptRequest,
    pub websocket: Option<Arc<WebSocketChannel>>,
    pub deadline: Option<Duration>,
}

impl InvocationRequest {
    pub fn new(script: Arc<dyn Script>, meta: Meta, request: ScriptRequest) -> Self {
        Self {
            script,
            meta,
            request,
            websocket: None,
            deadline: None,
        }
    }

    pub fn with_websocket(mut self, channel: Arc<WebSocketChannel>) -> Self {
        self.websocket = Some(channel);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[derive(Default)]
struct Counters {
    active: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

struct CoordinatorInner {
    kv: Arc<dyn KvStore>,
    bus: EventBus,
    fetcher: Arc<dyn Fetcher>,
    options: CoordinatorOptions,
    root: CancellationToken,
    live: DashMap<String, ExecutionContext>,
    counters: Counters,
}

/// Runs invocations against shared KV, event and fetch services.
#[derive(Clone)]
pub struct InvocationCoordinator {
    inner: Arc<CoordinatorInner>,
}

type TaskFuture = BoxFuture<'static, (String, Result<(), ScriptError>)>;

impl InvocationCoordinator {
    pub fn new(
        kv: Arc<dyn KvStore>,
        bus: EventBus,
        fetcher: Arc<dyn Fetcher>,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                kv,
                bus,
                fetcher,
                options,
                root: CancellationToken::new(),
                live: DashMap::new(),
                counters: Counters::default(),
            }),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Parent of every invocation token.
    pub fn root_token(&self) -> &CancellationToken {
        &self.inner.root
    }

    /// Cancel every live invocation and refuse new ones.
    pub fn shutdown(&self) {
        info!(
            "Shutting down coordinator with {} live invocations",
            self.inner.live.len()
        );
        self.inner.root.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Cancel a single live invocation.
    pub fn cancel(&self, id: &str, reason: CancelReason) -> bool {
        match self.inner.live.get(id) {
            Some(context) => {
                context.cancel(reason);
                true
            }
            None => false,
        }
    }

    pub fn live_invocations(&self) -> Vec<String> {
        self.inner.live.iter().map(|e| e.key().clone()).collect()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let c = &self.inner.counters;
        CoordinatorStats {
            active: c.active.load(Ordering::Relaxed),
            started: c.started.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
        }
    }

    /// Run one invocation to termination.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationReport {
        let id = Uuid::new_v4().to_string();
        let span = info_span!(
            "invocation",
            invocation_id = %id,
            script = %request.script.name(),
            org = %request.meta.org,
            repo = %request.meta.repo,
        );
        self.run(id, request).instrument(span).await
    }

    async fn run(&self, id: String, request: InvocationRequest) -> InvocationReport {
        let started_at = Instant::now();
        let InvocationRequest {
            script,
            meta,
            request,
            websocket,
            deadline,
        } = request;
        let script_name = script.name().to_string();

        let (context, scheduled) =
            ExecutionContext::new(&id, &script_name, self.inner.root.child_token());
        let response = ScriptResponse::new();
        let env = self.build_env(&context, &meta, request, response.clone(), websocket.clone());

        self.inner.live.insert(id.clone(), context.clone());
        self.inner.counters.started.fetch_add(1, Ordering::Relaxed);
        self.inner.counters.active.fetch_add(1, Ordering::Relaxed);
        info!("Invocation {} of {} started", id, script_name);

        let keepalive = match (&websocket, self.inner.options.ping_interval) {
            (Some(channel), Some(interval)) => Some(spawn_keepalive(
                channel.clone(),
                interval,
                self.inner.options.ping_timeout,
                context.token().clone(),
            )),
            _ => None,
        };

        let outcome = self
            .drive(&context, script, env, scheduled, websocket.clone(), deadline)
            .await;

        // Teardown: everything the invocation bound is released here.
        context.token().cancel();
        if let Some(handle) = keepalive {
            handle.abort();
        }
        let released = self.inner.bus.release_consumer(&ConsumerId::context(&id));
        if released > 0 {
            debug!("Released {} pull cursors of invocation {}", released, id);
        }
        if let Some(channel) = &websocket {
            channel.close().await;
        }
        context.transition(InvocationState::Terminated);
        self.inner.live.remove(&id);
        self.record(&id, &outcome);

        InvocationReport {
            id,
            script: script_name,
            state: context.state(),
            outcome,
            response: response.parts(),
            duration: started_at.elapsed(),
        }
    }

    fn build_env(
        &self,
        context: &ExecutionContext,
        meta: &Meta,
        request: ScriptRequest,
        response: ScriptResponse,
        websocket: Option<Arc<WebSocketChannel>>,
    ) -> ScriptEnv {
        ScriptEnv::new(EnvParts {
            context: context.clone(),
            request,
            response,
            kv: KvBinding::new(self.inner.kv.clone(), meta.clone(), context.clone()),
            event: EventBinding::new(self.inner.bus.clone(), context.clone()),
            websocket: websocket.map(|channel| WebSocketBinding::new(channel, context.clone())),
            fetcher: self.inner.fetcher.clone(),
            meta: meta.clone(),
            console: Console::new(context.id(), context.script()),
        })
    }

    async fn drive(
        &self,
        context: &ExecutionContext,
        script: Arc<dyn Script>,
        env: ScriptEnv,
        mut scheduled: mpsc::UnboundedReceiver<ScheduledTask>,
        websocket: Option<Arc<WebSocketChannel>>,
        deadline: Option<Duration>,
    ) -> InvocationOutcome {
        if !context.is_active() {
            context.transition(InvocationState::Cancelling);
            return InvocationOutcome::Cancelled(CancelReason::HostShutdown);
        }
        context.transition(InvocationState::Running);

        let mut main = script.run(env);
        let mut main_done = false;
        let mut completed = false;
        let mut failure: Option<ScriptError> = None;
        let mut tasks: FuturesUnordered<TaskFuture> = FuturesUnordered::new();

        let timer = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => futures::future::pending().await,
            }
        };
        tokio::pin!(timer);
        let channel = websocket.clone();
        let peer_lost = peer_lost(websocket);
        tokio::pin!(peer_lost);

        loop {
            tokio::select! {
                biased;
                _ = context.cancelled() => break,
                _ = &mut timer => {
                    warn!("Invocation {} exceeded its deadline", context.id());
                    context.cancel(CancelReason::Deadline);
                }
                _ = &mut peer_lost => {
                    context.cancel(CancelReason::PeerDisconnected);
                }
                Some(task) = scheduled.recv() => {
                    debug!("Task {} scheduled on {}", task.name, context.id());
                    tasks.push(name_task(task));
                }
                result = &mut main, if !main_done => {
                    main_done = true;
                    match result {
                        Ok(()) => {
                            completed = true;
                            break;
                        }
                        Err(e) => settle_error(context, e, channel.as_deref(), &mut failure),
                    }
                }
                Some((name, result)) = tasks.next(), if !tasks.is_empty() => {
                    match result {
                        Ok(()) => debug!("Task {} finished", name),
                        Err(e) => {
                            debug!("Task {} ended with {}", name, e);
                            settle_error(context, e, channel.as_deref(), &mut failure);
                        }
                    }
                }
            }
        }

        if completed && context.is_active() {
            context.transition(InvocationState::Completing);
            if !tasks.is_empty() {
                debug!(
                    "Dropping {} tasks still running after invocation {} returned",
                    tasks.len(),
                    context.id()
                );
            }
            return InvocationOutcome::Completed;
        }

        context.transition(InvocationState::Cancelling);
        self.drain(context, &mut main, main_done, &mut tasks).await;

        match failure {
            Some(e) => InvocationOutcome::Failed(e),
            None => InvocationOutcome::Cancelled(
                context.reason().unwrap_or(CancelReason::HostShutdown),
            ),
        }
    }

    /// Give a cancelled body and its tasks time to observe `Cancelled`.
    /// Errors raised while draining follow from the cancel and are not failures.
    async fn drain(
        &self,
        context: &ExecutionContext,
        main: &mut BoxFuture<'_, Result<(), ScriptError>>,
        mut main_done: bool,
        tasks: &mut FuturesUnordered<TaskFuture>,
    ) {
        let grace = tokio::time::sleep(self.inner.options.cancel_grace);
        tokio::pin!(grace);

        while !(main_done && tasks.is_empty()) {
            tokio::select! {
                _ = &mut grace => {
                    warn!(
                        "Invocation {} did not stop within {:?}; dropping {} tasks",
                        context.id(),
                        self.inner.options.cancel_grace,
                        tasks.len() + usize::from(!main_done)
                    );
                    break;
                }
                result = &mut *main, if !main_done => {
                    main_done = true;
                    if let Err(e) = result {
                        debug!("Body of {} stopped with {}", context.id(), e);
                    }
                }
                Some((name, result)) = tasks.next(), if !tasks.is_empty() => {
                    if let Err(e) = result {
                        debug!("Task {} stopped with {}", name, e);
                    }
                }
            }
        }
    }

    fn record(&self, id: &str, outcome: &InvocationOutcome) {
        let c = &self.inner.counters;
        c.active.fetch_sub(1, Ordering::Relaxed);
        match outcome {
            InvocationOutcome::Completed => {
                c.completed.fetch_add(1, Ordering::Relaxed);
                info!("Invocation {} completed", id);
            }
            InvocationOutcome::Cancelled(reason) => {
                c.cancelled.fetch_add(1, Ordering::Relaxed);
                info!(reason = %reason, "Invocation {} cancelled", id);
            }
            InvocationOutcome::Failed(e) => {
                c.failed.fetch_add(1, Ordering::Relaxed);
                error!(kind = ?e.kind(), "Invocation {} failed: {}", id, e);
            }
        }
    }
}

fn name_task(task: ScheduledTask) -> TaskFuture {
    let ScheduledTask { name, future } = task;
    future.map(move |result| (name, result)).boxed()
}

/// Map an error from the body or a task onto a cancellation cause.
///
/// A read or write that fails because the remote end went away cancels with
/// `PeerDisconnected`, even when the script saw the disconnect before the
/// channel's close signal reached the loop.
fn settle_error(
    context: &ExecutionContext,
    error: ScriptError,
    channel: Option<&WebSocketChannel>,
    failure: &mut Option<ScriptError>,
) {
    match error {
        ScriptError::Exit => {
            context.cancel(CancelReason::Exit);
        }
        e if is_disconnect(&e) && channel.is_some_and(WebSocketChannel::is_peer_closed) => {
            debug!("Invocation {} saw its peer leave: {}", context.id(), e);
            context.cancel(CancelReason::PeerDisconnected);
        }
        e if e.is_closed() => {
            // Closed after a cancel is the cancel itself; otherwise the script
            // used something it had already closed.
            if context.is_active() {
                failure.get_or_insert(e);
                context.cancel(CancelReason::ScriptFailed);
            }
        }
        e => {
            failure.get_or_insert(e);
            context.cancel(CancelReason::ScriptFailed);
        }
    }
}

fn is_disconnect(error: &ScriptError) -> bool {
    error.is_closed() || matches!(error, ScriptError::Channel(ChannelError::Transport(_)))
}

/// Resolves when the remote end of `channel` goes away.
async fn peer_lost(channel: Option<Arc<WebSocketChannel>>) {
    if let Some(channel) = channel {
        channel.closed().await;
        if channel.is_peer_closed() {
            return;
        }
    }
    futures::future::pending::<()>().await
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
