//! A suspended read must not hold up writes on the same connection.

use std::sync::Arc;
use std::time::Duration;

use scripthost_protocols::Frame;
use scripthost_websocket::{ChannelOptions, PeerMessage, WebSocketChannel, memory_transport};

#[tokio::test]
async fn test_write_proceeds_while_read_is_suspended() {
    let (mut peer, source, sink) = memory_transport();
    let channel = Arc::new(WebSocketChannel::new("duplex", source, sink, ChannelOptions::default()));

    let reader = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_text().await })
    };
    tokio::task::yield_now().await;

    tokio::time::timeout(Duration::from_secs(1), channel.write_text("tick"))
        .await
        .expect("write must not wait for the reader")
        .unwrap();
    assert_eq!(peer.recv().await, Some(PeerMessage::Frame(Frame::text("tick"))));

    peer.send_text("tock").await;
    assert_eq!(reader.await.unwrap().unwrap(), "tock");
}

#[tokio::test]
async fn test_echo_until_exit() {
    let (mut peer, source, sink) = memory_transport();
    let channel = Arc::new(WebSocketChannel::new("echo", source, sink, ChannelOptions::default()));

    let server = {
        let channel = channel.clone();
        tokio::spawn(async move {
            loop {
                let text = channel.read_text().await?;
                if text == "exit" {
                    break;
                }
                channel.write_text(format!("echo:{}", text)).await?;
            }
            channel.close().await;
            Ok::<_, scripthost_protocols::ChannelError>(())
        })
    };

    peer.send_text("one").await;
    assert_eq!(peer.recv_text().await.as_deref(), Some("echo:one"));
    peer.send_text("exit").await;
    assert_eq!(peer.recv().await, Some(PeerMessage::Close));

    server.await.unwrap().unwrap();
    assert!(channel.is_closed());
    assert!(!channel.is_peer_closed());
}
