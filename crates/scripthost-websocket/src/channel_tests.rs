use super::*;
use crate::memory::{PeerMessage, memory_transport};
use std::sync::Arc;

fn channel() -> (crate::memory::MemoryPeer, Arc<WebSocketChannel>) {
    let (peer, source, sink) = memory_transport();
    let channel = WebSocketChannel::new("test", source, sink, ChannelOptions { max_frame_bytes: 16 });
    (peer, Arc::new(channel))
}

#[tokio::test]
async fn test_read_text() {
    let (peer, channel) = channel();
    peer.send_text("hello").await;
    assert_eq!(channel.read_text().await.unwrap(), "hello");
}

#[tokio::test]
async fn test_read_raw_frame() {
    let (peer, channel) = channel();
    peer.send(Frame::binary(vec![1u8, 2, 3])).await;
    let frame = channel.read().await.unwrap();
    assert_eq!(frame.kind, FrameKind::Binary);
    assert_eq!(frame.kind.code(), 2);
    assert_eq!(&frame.data[..], &[1, 2, 3]);
}

#[tokio::test]
async fn test_write_text_and_binary() {
    let (mut peer, channel) = channel();
    channel.write_text("hi").await.unwrap();
    channel.write(2, vec![9u8]).await.unwrap();

    assert_eq!(peer.recv().await, Some(PeerMessage::Frame(Frame::text("hi"))));
    assert_eq!(
        peer.recv().await,
        Some(PeerMessage::Frame(Frame::binary(vec![9u8])))
    );
}

#[tokio::test]
async fn test_write_rejects_unknown_type_code() {
    let (_peer, channel) = channel();
    assert!(matches!(
        channel.write(7, vec![1u8]).await,
        Err(ChannelError::InvalidFrame(_))
    ));
}

#[tokio::test]
async fn test_write_rejects_oversized_frame() {
    let (_peer, channel) = channel();
    let err = channel.write_text("x".repeat(17)).await.unwrap_err();
    assert!(matches!(err, ChannelError::FrameTooLarge { size: 17, max: 16 }));
    assert!(!channel.is_closed());
}

#[tokio::test]
async fn test_close_unblocks_suspended_read() {
    let (_peer, channel) = channel();
    let reader = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_text().await })
    };
    tokio::task::yield_now().await;

    channel.close().await;
    let result = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .expect("read must not hang")
        .unwrap();
    assert!(matches!(result, Err(ChannelError::Closed)));
}

#[tokio::test]
async fn test_close_is_idempotent_and_sends_one_close() {
    let (mut peer, channel) = channel();
    channel.close().await;
    channel.close().await;
    assert!(channel.is_closed());

    assert_eq!(peer.recv().await, Some(PeerMessage::Close));
    drop(channel);
    assert_eq!(peer.recv().await, None);
}

#[tokio::test]
async fn test_operations_after_close_fail_fast() {
    let (_peer, channel) = channel();
    channel.close().await;
    assert!(matches!(channel.read().await, Err(ChannelError::Closed)));
    assert!(matches!(channel.write_text("x").await, Err(ChannelError::Closed)));
    assert!(matches!(channel.ping().await, Err(ChannelError::Closed)));
}

#[tokio::test]
async fn test_peer_close_cancels_owner() {
    let (mut peer, source, sink) = memory_transport();
    let owner = CancellationToken::new();
    let channel = WebSocketChannel::new("test", source, sink, ChannelOptions::default())
        .cancel_on_peer_close(owner.clone());

    peer.send_text("last").await;
    peer.close();

    assert_eq!(channel.read_text().await.unwrap(), "last");
    assert!(matches!(channel.read_text().await, Err(ChannelError::Closed)));
    assert!(channel.is_peer_closed());
    assert!(owner.is_cancelled());
    assert!(matches!(channel.write_text("late").await, Err(ChannelError::Closed)));
}

#[tokio::test]
async fn test_one_read_in_flight() {
    let (peer, channel) = channel();
    let first = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_text().await })
    };
    let second = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_text().await })
    };

    peer.send_text("a").await;
    peer.send_text("b").await;

    let mut got = vec![first.await.unwrap().unwrap(), second.await.unwrap().unwrap()];
    got.sort();
    assert_eq!(got, vec!["a", "b"]);
}

#[tokio::test]
async fn test_ping_reaches_peer() {
    let (mut peer, channel) = channel();
    channel.ping().await.unwrap();
    assert_eq!(peer.recv().await, Some(PeerMessage::Ping));
}
