use async_trait::async_trait;
use scripthost_protocols::ScriptError;
use scripthost_runtime::{Script, ScriptEnv};
use serde_json::json;

const TOPIC: &str = "messages";

/// Chat room over WebSocket. Every line a client sends is published as
/// `{"name", "data"}` and fanned out to every connected client.
pub struct Chat;

#[async_trait]
impl Script for Chat {
    fn name(&self) -> &str {
        "chat"
    }

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError> {
        let name = env
            .request()
            .get_query("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ScriptError::validation("missing or empty name parameter"))?
            .to_string();

        let ws = env.websocket()?;
        let outbound = ws.clone();
        env.event().subscribe(TOPIC)?.on(move |message| {
            let outbound = outbound.clone();
            async move { outbound.write_text(message).await }
        })?;

        let result: Result<(), ScriptError> = async {
            loop {
                let data = ws.read_text().await?;
                if data == "exit" {
                    return Ok(());
                }
                let data = data.trim();
                if !data.is_empty() {
                    let message = json!({ "name": name, "data": data });
                    env.event().put(TOPIC, message.to_string()).await?;
                }
            }
        }
        .await;

        ws.close().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scripthost_event::EventBus;
    use scripthost_kv::MemoryKvStore;
    use scripthost_protocols::Meta;
    use scripthost_runtime::{
        CoordinatorOptions, HttpFetcher, InvocationCoordinator, InvocationOutcome,
        InvocationRequest, ScriptRequest,
    };
    use scripthost_websocket::{ChannelOptions, WebSocketChannel, memory_transport};

    fn coordinator() -> InvocationCoordinator {
        InvocationCoordinator::new(
            Arc::new(MemoryKvStore::new()),
            EventBus::default(),
            Arc::new(HttpFetcher::new()),
            CoordinatorOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_missing_name_fails() {
        let request = InvocationRequest::new(
            Arc::new(Chat),
            Meta::new("acme", "site", "abc"),
            ScriptRequest::new("GET", "/"),
        );
        let report = coordinator().invoke(request).await;
        match report.outcome {
            InvocationOutcome::Failed(err) => assert!(err.to_string().contains("name")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_message_is_broadcast_back() {
        let coordinator = coordinator();
        let (mut peer, source, sink) = memory_transport();
        let channel = Arc::new(WebSocketChannel::new("chat", source, sink, ChannelOptions::default()));
        let request = InvocationRequest::new(
            Arc::new(Chat),
            Meta::new("acme", "site", "abc"),
            ScriptRequest::new("GET", "/")
                .with_query("name", "alice")
                .with_header("Upgrade", "websocket"),
        )
        .with_websocket(channel);
        let run = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.invoke(request).await }
        });

        assert!(peer.send_text("hi").await);
        let reply = peer.recv_text().await.unwrap();
        let message: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(message["name"], "alice");
        assert_eq!(message["data"], "hi");

        assert!(peer.send_text("exit").await);
        assert!(peer.recv_text().await.is_none());

        let report = run.await.unwrap();
        assert!(matches!(report.outcome, InvocationOutcome::Completed));
        assert_eq!(coordinator.bus().stats().subscribers, 0);
    }
}
