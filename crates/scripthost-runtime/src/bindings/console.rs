//! `console.*`, routed into tracing under the `script` target.

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct Console {
    invocation_id: String,
    script: String,
}

impl Console {
    pub(crate) fn new(invocation_id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            script: script.into(),
        }
    }

    pub fn log(&self, message: &str) {
        info!(target: "script", invocation_id = %self.invocation_id, script = %self.script, "{}", message);
    }

    pub fn info(&self, message: &str) {
        info!(target: "script", invocation_id = %self.invocation_id, script = %self.script, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(target: "script", invocation_id = %self.invocation_id, script = %self.script, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(target: "script", invocation_id = %self.invocation_id, script = %self.script, "{}", message);
    }

    pub fn debug(&self, message: &str) {
        debug!(target: "script", invocation_id = %self.invocation_id, script = %self.script, "{}", message);
    }
}
