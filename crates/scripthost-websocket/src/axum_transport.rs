//! axum WebSocket transport.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use scripthost_protocols::{ChannelError, Frame, FrameKind};
use tracing::debug;

use crate::transport::{FrameSink, FrameSource};

pub struct AxumSource {
    stream: SplitStream<WebSocket>,
}

pub struct AxumSink {
    sink: SplitSink<WebSocket, Message>,
}

/// Split an upgraded axum socket into adapter halves.
pub fn split_axum(socket: WebSocket) -> (AxumSource, AxumSink) {
    let (sink, stream) = socket.split();
    (AxumSource { stream }, AxumSink { sink })
}

#[async_trait]
impl FrameSource for AxumSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, ChannelError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(Frame::text(text.as_str()))),
                Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::binary(data))),
                // axum answers pings itself.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket close frame received: {:?}", frame);
                    return Ok(None);
                }
                Some(Err(e)) => return Err(ChannelError::Transport(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}

#[async_trait]
impl FrameSink for AxumSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ChannelError> {
        let message = match frame.kind {
            FrameKind::Text => Message::Text(frame.into_text()?.into()),
            FrameKind::Binary => Message::Binary(frame.data),
        };
        self.sink
            .send(message)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn send_ping(&mut self) -> Result<(), ChannelError> {
        self.sink
            .send(Message::Ping(Bytes::new()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        // The peer may already be gone; closing is best effort.
        let _ = self.sink.send(Message::Close(None)).await;
        self.sink
            .close()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }
}
