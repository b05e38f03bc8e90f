//! # ScriptHost Event
//!
//! Process-wide publish/subscribe bus keyed by topic name.
//!
//! Each topic keeps one ordered, bounded log. Three delivery modes read it:
//!
//! - **load**: latest payload, waiting for the first publish if needed
//! - **pull**: next payload not yet seen by a consumer, with per-consumer cursors
//! - **subscribe**: push delivery of every payload published after registration
//!
//! Publishers never wait on readers. Push subscribers that fall too far behind
//! are detached and observe [`EventError::Lagged`].
//!
//! [`EventError::Lagged`]: scripthost_protocols::EventError::Lagged

mod bus;
mod consumer;
mod subscription;
mod topic;

pub use bus::{EventBus, EventStats};
pub use consumer::ConsumerId;
pub use subscription::{Subscription, SubscriptionId};
