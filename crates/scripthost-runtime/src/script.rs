//! The unit of work the host runs.

use async_trait::async_trait;
use scripthost_protocols::ScriptError;

use crate::env::ScriptEnv;

/// A script the host can invoke.
///
/// `run` receives the invocation's bindings and suspends only on bound
/// calls. Returning `Ok` completes the invocation; any error other than
/// `Exit` fails it.
#[async_trait]
pub trait Script: Send + Sync {
    /// Route name of the script.
    fn name(&self) -> &str;

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError>;
}
