//! Objects a script reaches through its [`ScriptEnv`](crate::ScriptEnv).

mod console;
mod event;
mod fetch;
mod kv;
mod websocket;

pub use console::Console;
pub use event::{EventBinding, SubscribeBuilder};
pub use fetch::{FetchRequest, FetchResponse, Fetcher, HttpFetcher};
pub use kv::{KvBinding, ScopedKv};
pub use websocket::WebSocketBinding;
