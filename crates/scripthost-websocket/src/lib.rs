//! # ScriptHost WebSocket
//!
//! Adapter that turns one accepted WebSocket connection into awaitable
//! `read` / `write` operations for a script.
//!
//! The adapter is transport-agnostic: it talks to a [`FrameSource`] and a
//! [`FrameSink`]. [`split_axum`] provides both halves for an axum socket and
//! [`memory_transport`] provides an in-process pair for tests.

mod axum_transport;
mod channel;
mod keepalive;
mod memory;
mod transport;

pub use axum_transport::{AxumSink, AxumSource, split_axum};
pub use channel::{ChannelOptions, WebSocketChannel};
pub use keepalive::spawn_keepalive;
pub use memory::{MemoryPeer, MemorySink, MemorySource, PeerMessage, memory_transport};
pub use transport::{FrameSink, FrameSource};
