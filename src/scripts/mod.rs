//! Scripts bundled with the host binary.

mod chat;
mod counter;
mod echo;

use std::sync::Arc;

use scripthost_api::{ApiError, ScriptRegistry};

pub use chat::Chat;
pub use counter::Counter;
pub use echo::Echo;

/// Register every bundled script.
pub fn register_builtin(registry: &ScriptRegistry) -> Result<(), ApiError> {
    registry.register(Arc::new(Counter))?;
    registry.register(Arc::new(Echo))?;
    registry.register(Arc::new(Chat))?;
    Ok(())
}
