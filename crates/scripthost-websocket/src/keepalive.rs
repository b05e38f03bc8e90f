//! Keep-alive pings.

use std::sync::Arc;
use std::time::Duration;

use scripthost_protocols::ChannelError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::channel::WebSocketChannel;

/// Ping `channel` every `interval` until `stop` fires or the channel closes.
///
/// A ping that fails or does not flush within `timeout` marks the peer as
/// gone, which cancels whatever the channel was told to cancel on peer close.
pub fn spawn_keepalive(
    channel: Arc<WebSocketChannel>,
    interval: Duration,
    timeout: Duration,
    stop: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = channel.closed() => break,
                _ = ticker.tick() => {}
            }

            match tokio::time::timeout(timeout, channel.ping()).await {
                Ok(Ok(())) => debug!("WebSocket {} ping ok", channel.id()),
                Ok(Err(ChannelError::Closed)) => break,
                Ok(Err(e)) => {
                    warn!("WebSocket {} ping failed: {}", channel.id(), e);
                    channel.mark_peer_gone("ping failed");
                    break;
                }
                Err(_) => {
                    warn!("WebSocket {} ping timed out", channel.id());
                    channel.mark_peer_gone("ping timed out");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelOptions;
    use crate::memory::{PeerMessage, memory_transport};

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_pings_periodically() {
        let (mut peer, source, sink) = memory_transport();
        let channel = Arc::new(WebSocketChannel::new("ka", source, sink, ChannelOptions::default()));
        let stop = CancellationToken::new();
        let handle = spawn_keepalive(
            channel.clone(),
            Duration::from_secs(15),
            Duration::from_secs(5),
            stop.clone(),
        );

        assert_eq!(peer.recv().await, Some(PeerMessage::Ping));
        assert_eq!(peer.recv().await, Some(PeerMessage::Ping));

        stop.cancel();
        handle.await.unwrap();
        assert!(!channel.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ping_cancels_owner() {
        let (peer, source, sink) = memory_transport();
        let owner = CancellationToken::new();
        let channel = Arc::new(
            WebSocketChannel::new("ka", source, sink, ChannelOptions::default())
                .cancel_on_peer_close(owner.clone()),
        );
        // Peer vanishes entirely; the next ping cannot be delivered.
        drop(peer);

        let handle = spawn_keepalive(
            channel.clone(),
            Duration::from_secs(15),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        handle.await.unwrap();

        assert!(owner.is_cancelled());
        assert!(channel.is_peer_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_stops_when_channel_closes() {
        let (_peer, source, sink) = memory_transport();
        let channel = Arc::new(WebSocketChannel::new("ka", source, sink, ChannelOptions::default()));
        let handle = spawn_keepalive(
            channel.clone(),
            Duration::from_secs(15),
            Duration::from_secs(5),
            CancellationToken::new(),
        );
        channel.close().await;
        handle.await.unwrap();
        assert!(!channel.is_peer_closed());
    }
}
