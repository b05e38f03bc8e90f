//! `websocket()`.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use scripthost_protocols::{ChannelError, Frame, ScriptError};
use scripthost_websocket::WebSocketChannel;

use crate::context::ExecutionContext;

/// The invocation's WebSocket connection.
///
/// Every call to `ScriptEnv::websocket()` returns a handle to the same
/// channel. Operations resume with `Cancelled` when the invocation is
/// cancelled and with `Closed` when the connection closes.
#[derive(Clone)]
pub struct WebSocketBinding {
    channel: Arc<WebSocketChannel>,
    context: ExecutionContext,
}

impl WebSocketBinding {
    /// `TypeTextMessage`
    pub const TEXT: u8 = 1;
    /// `TypeBinaryMessage`
    pub const BINARY: u8 = 2;

    pub(crate) fn new(channel: Arc<WebSocketChannel>, context: ExecutionContext) -> Self {
        Self { channel, context }
    }

    pub fn channel(&self) -> &Arc<WebSocketChannel> {
        &self.channel
    }

    pub async fn read_text(&self) -> Result<String, ScriptError> {
        self.context.guard(self.channel.read_text()).await
    }

    pub async fn read(&self) -> Result<Frame, ScriptError> {
        self.context.guard(self.channel.read()).await
    }

    pub async fn write_text(&self, text: impl Into<String>) -> Result<(), ScriptError> {
        self.context.guard(self.channel.write_text(text)).await
    }

    /// Write with a numeric frame type (`TEXT` or `BINARY`).
    pub async fn write(&self, code: u8, data: impl Into<Bytes>) -> Result<(), ScriptError> {
        self.context.guard(self.channel.write(code, data)).await
    }

    pub async fn ping(&self) -> Result<(), ScriptError> {
        self.context.guard(self.channel.ping()).await
    }

    /// Close the connection. Idempotent and allowed after cancellation.
    pub async fn close(&self) {
        self.channel.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    /// Run `handler(type_code, text)` for every inbound frame on the
    /// invocation's schedule until the connection closes.
    pub fn on<F, Fut>(&self, mut handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(u8, String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ScriptError>> + Send + 'static,
    {
        let this = self.clone();
        let driver = async move {
            loop {
                match this.read().await {
                    Ok(frame) => {
                        let code = frame.kind.code();
                        handler(code, frame.into_text()?).await?;
                    }
                    Err(ScriptError::Channel(ChannelError::Closed)) | Err(ScriptError::Cancelled) => {
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        self.context.schedule("websocket:on", driver.boxed())
    }
}
