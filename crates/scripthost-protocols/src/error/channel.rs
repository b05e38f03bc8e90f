//! WebSocket channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("WebSocket closed")]
    Closed,

    #[error("WebSocket transport error: {0}")]
    Transport(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Frame too large: {size} bytes, max {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    #[error("No WebSocket connection bound to this invocation")]
    Unavailable,
}
