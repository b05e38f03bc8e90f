//! In-process transport pair.

use async_trait::async_trait;
use scripthost_protocols::{ChannelError, Frame};
use tokio::sync::mpsc;

use crate::transport::{FrameSink, FrameSource};

const BUFFER: usize = 64;

/// What the host side sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerMessage {
    Frame(Frame),
    Ping,
    Close,
}

/// The remote end of an in-memory connection.
pub struct MemoryPeer {
    to_host: Option<mpsc::Sender<Frame>>,
    from_host: mpsc::Receiver<PeerMessage>,
}

pub struct MemorySource {
    rx: mpsc::Receiver<Frame>,
}

pub struct MemorySink {
    tx: mpsc::Sender<PeerMessage>,
}

/// Create a connected peer and the host-side adapter halves.
pub fn memory_transport() -> (MemoryPeer, MemorySource, MemorySink) {
    let (to_host, rx) = mpsc::channel(BUFFER);
    let (tx, from_host) = mpsc::channel(BUFFER);
    (
        MemoryPeer {
            to_host: Some(to_host),
            from_host,
        },
        MemorySource { rx },
        MemorySink { tx },
    )
}

impl MemoryPeer {
    /// Send a frame to the host; false once the peer side is closed.
    pub async fn send(&self, frame: Frame) -> bool {
        match &self.to_host {
            Some(tx) => tx.send(frame).await.is_ok(),
            None => false,
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(Frame::text(text)).await
    }

    /// Close the peer's sending side; the host sees end of stream.
    pub fn close(&mut self) {
        self.to_host = None;
    }

    /// Next message from the host, or `None` once the host sink is dropped.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.from_host.recv().await
    }

    /// Next text frame from the host, skipping pings.
    pub async fn recv_text(&mut self) -> Option<String> {
        loop {
            match self.recv().await? {
                PeerMessage::Frame(frame) => return frame.into_text().ok(),
                PeerMessage::Ping => continue,
                PeerMessage::Close => return None,
            }
        }
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, ChannelError> {
        Ok(self.rx.recv().await)
    }
}

impl MemorySink {
    async fn push(&self, message: PeerMessage) -> Result<(), ChannelError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ChannelError::Transport("peer is gone".to_string()))
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ChannelError> {
        self.push(PeerMessage::Frame(frame)).await
    }

    async fn send_ping(&mut self) -> Result<(), ChannelError> {
        self.push(PeerMessage::Ping).await
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.push(PeerMessage::Close).await
    }
}
