//! Transport seam under the channel adapter.

use async_trait::async_trait;
use scripthost_protocols::{ChannelError, Frame};

/// Inbound half of a connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next complete data frame; `None` once the peer has closed.
    ///
    /// Control frames are handled by the transport and never returned.
    async fn next_frame(&mut self) -> Result<Option<Frame>, ChannelError>;
}

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one data frame, returning once it is flushed.
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ChannelError>;

    /// Send a ping control frame.
    async fn send_ping(&mut self) -> Result<(), ChannelError>;

    /// Send a close frame and release the transport.
    async fn close(&mut self) -> Result<(), ChannelError>;
}
