//! # ScriptHost Protocols
//!
//! Types shared by every layer of the script sandbox host:
//!
//! - [`Namespace`] / [`ScopeKind`]: addressing for the KV store
//! - [`Meta`]: read-only invocation metadata supplied by the host
//! - [`Frame`] / [`FrameKind`]: WebSocket data frames
//! - [`error`]: per-domain error enums and the script-facing [`ScriptError`]

pub mod error;
pub mod frame;
pub mod meta;
pub mod namespace;

pub use error::{ChannelError, ErrorKind, EventError, KvError, ScriptError};
pub use frame::{Frame, FrameKind};
pub use meta::Meta;
pub use namespace::{Namespace, ScopeKind};
