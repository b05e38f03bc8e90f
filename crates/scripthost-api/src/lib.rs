//! # ScriptHost API
//!
//! HTTP front door of the host. Every request to `/{org}/{repo}/{script}`
//! becomes one invocation on the [`InvocationCoordinator`]; requests that
//! ask for a WebSocket upgrade hand the upgraded connection to the script
//! and stay open until the invocation terminates.
//!
//! [`InvocationCoordinator`]: scripthost_runtime::InvocationCoordinator

pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use handlers::HealthResponse;
pub use registry::ScriptRegistry;
pub use routes::create_router;
pub use server::{ApiServer, serve};
pub use state::AppState;
