//! The channel adapter.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use scripthost_config::WebSocketConfig;
use scripthost_protocols::{ChannelError, Frame, FrameKind};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::transport::{FrameSink, FrameSource};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Adapter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    pub max_frame_bytes: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self::from(&WebSocketConfig::default())
    }
}

impl From<&WebSocketConfig> for ChannelOptions {
    fn from(config: &WebSocketConfig) -> Self {
        Self {
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

/// One WebSocket connection as seen by a script.
///
/// At most one read and one write are in flight at any time; concurrent
/// callers queue on the corresponding half. Every operation races the
/// channel's close signal, so `close()` or a peer disconnect resumes all
/// suspended callers with [`ChannelError::Closed`].
pub struct WebSocketChannel {
    id: String,
    source: Mutex<Box<dyn FrameSource>>,
    sink: Mutex<Box<dyn FrameSink>>,
    closed: CancellationToken,
    closing: AtomicBool,
    peer_gone: AtomicBool,
    on_peer_close: Option<CancellationToken>,
    options: ChannelOptions,
}

impl WebSocketChannel {
    pub fn new(
        id: impl Into<String>,
        source: impl FrameSource + 'static,
        sink: impl FrameSink + 'static,
        options: ChannelOptions,
    ) -> Self {
        Self {
            id: id.into(),
            source: Mutex::new(Box::new(source)),
            sink: Mutex::new(Box::new(sink)),
            closed: CancellationToken::new(),
            closing: AtomicBool::new(false),
            peer_gone: AtomicBool::new(false),
            on_peer_close: None,
            options,
        }
    }

    /// Cancel `token` when the peer disconnects or stops answering.
    pub fn cancel_on_peer_close(mut self, token: CancellationToken) -> Self {
        self.on_peer_close = Some(token);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// True when the connection ended from the remote side.
    pub fn is_peer_closed(&self) -> bool {
        self.peer_gone.load(Ordering::Acquire)
    }

    /// Resolves once the channel is closed from either side.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    async fn guarded<T>(
        &self,
        op: impl Future<Output = Result<T, ChannelError>>,
    ) -> Result<T, ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(ChannelError::Closed),
            result = op => result,
        }
    }

    /// Next frame of either kind.
    pub async fn read(&self) -> Result<Frame, ChannelError> {
        let result = self
            .guarded(async {
                let mut source = self.source.lock().await;
                source.next_frame().await
            })
            .await;

        match result {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => {
                self.mark_peer_gone("peer closed the connection");
                Err(ChannelError::Closed)
            }
            Err(ChannelError::Transport(e)) => {
                self.mark_peer_gone(&e);
                Err(ChannelError::Transport(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Next frame decoded as UTF-8, whatever its kind.
    pub async fn read_text(&self) -> Result<String, ChannelError> {
        self.read().await?.into_text()
    }

    pub async fn write_text(&self, text: impl Into<String>) -> Result<(), ChannelError> {
        self.send(Frame::text(text)).await
    }

    /// Write a frame given its numeric type code.
    pub async fn write(&self, code: u8, data: impl Into<Bytes>) -> Result<(), ChannelError> {
        let kind = FrameKind::from_code(code)?;
        self.send(Frame::new(kind, data)).await
    }

    /// Write a frame, returning once it is flushed.
    pub async fn send(&self, frame: Frame) -> Result<(), ChannelError> {
        if frame.len() > self.options.max_frame_bytes {
            return Err(ChannelError::FrameTooLarge {
                size: frame.len(),
                max: self.options.max_frame_bytes,
            });
        }
        let result = self
            .guarded(async {
                let mut sink = self.sink.lock().await;
                sink.send_frame(frame).await
            })
            .await;
        if let Err(ChannelError::Transport(e)) = &result {
            self.mark_peer_gone(e);
        }
        result
    }

    pub async fn ping(&self) -> Result<(), ChannelError> {
        let result = self
            .guarded(async {
                let mut sink = self.sink.lock().await;
                sink.send_ping().await
            })
            .await;
        if let Err(ChannelError::Transport(e)) = &result {
            self.mark_peer_gone(e);
        }
        result
    }

    /// Close the connection. Idempotent.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wake every suspended caller first so the sink lock frees up.
        self.closed.cancel();

        if !self.is_peer_closed() {
            let mut sink = self.sink.lock().await;
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("WebSocket {} close failed: {}", self.id, e),
                Err(_) => debug!("WebSocket {} close timed out", self.id),
            }
        }
        info!("WebSocket {} closed", self.id);
    }

    /// Record that the remote side is gone and release everyone waiting.
    pub fn mark_peer_gone(&self, reason: &str) {
        if self.peer_gone.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("WebSocket {} disconnected: {}", self.id, reason);
        self.closed.cancel();
        if let Some(token) = &self.on_peer_close {
            token.cancel();
        }
    }
}

impl fmt::Debug for WebSocketChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("peer_closed", &self.is_peer_closed())
            .finish()
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
