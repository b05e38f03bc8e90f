//! # ScriptHost Runtime
//!
//! Runs scripts against the host's shared services. Each invocation gets an
//! [`ExecutionContext`] holding its cancellation token and lifecycle state,
//! and a [`ScriptEnv`] exposing the bindings a script may call:
//!
//! - `kv`: namespaced key-value storage scoped to the script's repo or org
//! - `event`: pub/sub over the shared [`EventBus`](scripthost_event::EventBus)
//! - `websocket`: the invocation's connection, when it was upgraded
//! - `fetch`: outbound HTTP
//! - `request` / `response`: the inbound HTTP exchange
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──► Running ──┬──► Completing ──┐
//!                       └──► Cancelling ──┴──► Terminated
//! ```
//!
//! The [`InvocationCoordinator`] drives the body and every task it spawns on
//! one cooperative loop. The first of exit, failure, peer disconnect,
//! deadline or host shutdown cancels the context; every suspended binding
//! call then resumes with `Cancelled` and the invocation terminates once.

pub mod bindings;
mod context;
mod coordinator;
mod env;
mod outcome;
mod request;
mod response;
mod script;
mod state;

pub use bindings::{
    Console, EventBinding, FetchRequest, FetchResponse, Fetcher, HttpFetcher, KvBinding, ScopedKv,
    SubscribeBuilder, WebSocketBinding,
};
pub use context::ExecutionContext;
pub use coordinator::{CoordinatorOptions, InvocationCoordinator, InvocationRequest};
pub use env::{ScriptEnv, TaskHandle};
pub use outcome::{CoordinatorStats, InvocationOutcome, InvocationReport};
pub use request::ScriptRequest;
pub use response::{CookieOptions, ResponseParts, SameSite, ScriptResponse};
pub use script::Script;
pub use state::{CancelReason, InvocationState};
