//! First-to-finish composition over a WebSocket session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use scripthost_event::EventBus;
use scripthost_kv::MemoryKvStore;
use scripthost_protocols::{Meta, ScriptError};
use scripthost_runtime::{
    CoordinatorOptions, HttpFetcher, InvocationCoordinator, InvocationOutcome, InvocationRequest,
    InvocationState, Script, ScriptEnv, ScriptRequest,
};
use scripthost_websocket::{ChannelOptions, WebSocketChannel, memory_transport};

/// Task A reads until the peer says `exit`; task B pulls a topic nobody
/// publishes to. Whichever finishes first ends the session.
struct Racer {
    b_dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Script for Racer {
    fn name(&self) -> &str {
        "racer"
    }

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError> {
        let ws = env.websocket()?;
        let reader = ws.clone();
        let task_a = async move {
            loop {
                if reader.read_text().await? == "exit" {
                    return Ok::<_, ScriptError>("a");
                }
            }
        };

        let flag = DropFlag(self.b_dropped.clone());
        let events = env.event().clone();
        let task_b = async move {
            let _flag = flag;
            loop {
                if let Err(e) = events.pull("idle").await {
                    return Err::<&str, _>(e);
                }
            }
        };

        let (_, winner) = env.race(vec![task_a.boxed(), task_b.boxed()]).await?;
        ws.write_text(format!("winner: {}", winner)).await?;
        Ok(())
    }
}

#[tokio::test]
async fn test_first_finisher_cancels_the_other() {
    let coordinator = InvocationCoordinator::new(
        Arc::new(MemoryKvStore::new()),
        EventBus::default(),
        Arc::new(HttpFetcher::new()),
        CoordinatorOptions {
            ping_interval: None,
            ..Default::default()
        },
    );
    let b_dropped = Arc::new(AtomicBool::new(false));

    let (mut peer, source, sink) = memory_transport();
    let channel = Arc::new(WebSocketChannel::new("race", source, sink, ChannelOptions::default()));
    let request = InvocationRequest::new(
        Arc::new(Racer {
            b_dropped: b_dropped.clone(),
        }),
        Meta::new("acme", "site", "abc"),
        ScriptRequest::new("GET", "/"),
    )
    .with_websocket(channel.clone());

    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.invoke(request).await })
    };

    assert!(peer.send_text("noise").await);
    assert!(peer.send_text("exit").await);
    assert_eq!(peer.recv_text().await.as_deref(), Some("winner: a"));

    let report = run.await.unwrap();
    assert!(matches!(report.outcome, InvocationOutcome::Completed));
    assert_eq!(report.state, InvocationState::Terminated);
    assert!(b_dropped.load(Ordering::SeqCst));
    assert!(channel.is_closed());

    let stats = coordinator.stats();
    assert_eq!(stats.started, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.cancelled + stats.failed, 0);
    assert_eq!(coordinator.bus().stats().consumers, 0);
}
