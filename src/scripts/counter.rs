use async_trait::async_trait;
use scripthost_protocols::ScriptError;
use scripthost_runtime::{Script, ScriptEnv};

/// Repo-scoped counter. `/put` increments it; any other path reads it.
pub struct Counter;

const KEY: &str = "key";

#[async_trait]
impl Script for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    async fn run(&self, env: ScriptEnv) -> Result<(), ScriptError> {
        let db = env.kv().repo(["self"])?;

        if env.request().path() == "/put" {
            loop {
                let current = db.get(KEY).await?;
                let next = match current.as_deref() {
                    None => 0,
                    Some(raw) => raw
                        .parse::<u64>()
                        .map_err(|_| ScriptError::failed(format!("counter holds {:?}", raw)))?
                        + 1,
                };
                if db
                    .compare_and_swap(KEY, current.as_deref(), &next.to_string())
                    .await?
                {
                    break;
                }
            }
        }

        let value = db.get(KEY).await?.unwrap_or_else(|| "unset".to_string());
        env.response().set_header("content-type", "text/plain; charset=utf-8");
        env.response().write(format!("current value: {}", value));
        Ok(())
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
        CoordinatorOptions, HttpFetcher, InvocationCoordinator, InvocationRequest, ScriptRequest,
    };

    fn coordinator() -> InvocationCoordinator {
        InvocationCoordinator::new(
            Arc::new(MemoryKvStore::new()),
            EventBus::default(),
            Arc::new(HttpFetcher::new()),
            CoordinatorOptions::default(),
        )
    }

    fn hit(path: &str) -> InvocationRequest {
        InvocationRequest::new(
            Arc::new(Counter),
            Meta::new("acme", "site", "abc"),
            ScriptRequest::new("GET", path),
        )
    }

    #[tokio::test]
    async fn test_concurrent_increments_converge() {
        let coordinator = coordinator();
        let runs: Vec<_> = (0..20)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move { coordinator.invoke(hit("/put")).await })
            })
            .collect();
        for run in futures::future::join_all(runs).await {
            assert!(run.unwrap().outcome.is_success());
        }

        let report = coordinator.invoke(hit("/")).await;
        // First increment initialises the key to 0.
        assert_eq!(&report.response.body[..], b"current value: 19");
    }

    #[tokio::test]
    async fn test_read_before_first_increment() {
        let report = coordinator().invoke(hit("/")).await;
        assert_eq!(&report.response.body[..], b"current value: unset");
    }
}
