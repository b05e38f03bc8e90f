//! # ScriptHost KV
//!
//! Namespaced key-value storage for scripts.
//!
//! Every operation is addressed by an explicit [`Namespace`], so keyspaces of
//! different tenants and groups never share state. The store offers:
//!
//! - Unconditional `get` / `set` / `delete`
//! - Atomic `put_if_not_exists` and `compare_and_swap` (linearizable per key)
//! - Optional per-entry TTL, checked lazily on read and reclaimed by a sweeper
//! - Cursor-paginated listing in lexicographic key order
//!
//! [`KvNamespace`] binds a store to one namespace and is what scripts see as
//! `kv.repo(...)` / `kv.org(...)`.
//!
//! [`Namespace`]: scripthost_protocols::Namespace

pub mod cursor;
pub mod handle;
pub mod memory;
pub mod store;
pub mod sweeper;
pub mod types;

pub use cursor::ListCursor;
pub use handle::KvNamespace;
pub use memory::MemoryKvStore;
pub use store::KvStore;
pub use sweeper::spawn_sweeper;
pub use types::{KvEntry, ListLimits, ListPage, ListRequest, Version};
