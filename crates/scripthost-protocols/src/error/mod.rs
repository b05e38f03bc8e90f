//! Error types shared across the host.

mod channel;
mod event;
mod kv;
mod script;

pub use channel::*;
pub use event::*;
pub use kv::*;
pub use script::*;
