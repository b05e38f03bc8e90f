//! Two WebSocket invocations talking through the shared event bus.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scripthost_event::EventBus;
use scripthost_kv::MemoryKvStore;
use scripthost_protocols::{Meta, ScriptError};
use scripthost_runtime::{
    CancelReason, CoordinatorOptions, HttpFetcher, InvocationCoordinator, InvocationOutcome,
    InvocationRequest, Script, ScriptEnv, ScriptRequest,
};
use scripthost_websocket::{ChannelOptions, MemoryPeer, WebSocketChannel, memory_transport};

/// Relays every inbound frame to the room topic and every room message back
/// to the socket. The message `exit` ends the invocation.
struct ChatRoom;

#[async_trait]
impl Script for ChatRoom {
    fn name(&self) -> &str {
        "chat"
    }

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError> {
        let ws = env.websocket()?;

        let outbound = ws.clone();
        env.event().subscribe("room")?.on(move |message| {
            let outbound = outbound.clone();
            async move { outbound.write_text(message).await }
        })?;
        ws.write_text("joined").await?;

        loop {
            let text = ws.read_text().await?;
            if text == "exit" {
                return Err(env.exit());
            }
            env.event().put("room", text).await?;
        }
    }
}

fn coordinator() -> InvocationCoordinator {
    InvocationCoordinator::new(
        Arc::new(MemoryKvStore::new()),
        EventBus::default(),
        Arc::new(HttpFetcher::new()),
        CoordinatorOptions {
            ping_interval: None,
            cancel_grace: Duration::from_millis(200),
            ..Default::default()
        },
    )
}

fn connect(
    coordinator: &InvocationCoordinator,
    id: &str,
) -> (MemoryPeer, tokio::task::JoinHandle<scripthost_runtime::InvocationReport>) {
    let (peer, source, sink) = memory_transport();
    let channel = Arc::new(WebSocketChannel::new(id, source, sink, ChannelOptions::default()));
    let request = InvocationRequest::new(
        Arc::new(ChatRoom),
        Meta::new("acme", "chat", "c0ffee"),
        ScriptRequest::new("GET", "/acme/chat/chat").with_header("upgrade", "websocket"),
    )
    .with_websocket(channel);

    let coordinator = coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.invoke(request).await });
    (peer, handle)
}

#[tokio::test]
async fn test_messages_fan_out_and_peers_leave_independently() {
    let coordinator = coordinator();

    let (mut alice, alice_run) = connect(&coordinator, "alice");
    assert_eq!(alice.recv_text().await.as_deref(), Some("joined"));
    let (mut bob, bob_run) = connect(&coordinator, "bob");
    assert_eq!(bob.recv_text().await.as_deref(), Some("joined"));

    assert!(alice.send_text("hello").await);
    assert_eq!(alice.recv_text().await.as_deref(), Some("hello"));
    assert_eq!(bob.recv_text().await.as_deref(), Some("hello"));

    alice.close();
    let alice_report = alice_run.await.unwrap();
    assert!(matches!(
        alice_report.outcome,
        InvocationOutcome::Cancelled(CancelReason::PeerDisconnected)
    ));

    // Bob keeps working after Alice is gone.
    assert!(bob.send_text("still here").await);
    assert_eq!(bob.recv_text().await.as_deref(), Some("still here"));

    assert!(bob.send_text("exit").await);
    let bob_report = bob_run.await.unwrap();
    assert!(matches!(
        bob_report.outcome,
        InvocationOutcome::Cancelled(CancelReason::Exit)
    ));
    assert_eq!(bob.recv_text().await, None);

    let stats = coordinator.stats();
    assert_eq!(stats.started, 2);
    assert_eq!(stats.cancelled, 2);
    assert_eq!(stats.active, 0);
    assert_eq!(coordinator.bus().stats().subscribers, 0);
}
