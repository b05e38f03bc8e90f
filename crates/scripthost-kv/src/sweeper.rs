//! Background reclamation of expired entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::KvStore;

/// Run [`KvStore::sweep_expired`] every `interval` until `token` is cancelled.
///
/// Readers never observe expired entries regardless of sweeping; the
/// sweeper only bounds memory held by keys nobody reads again.
pub fn spawn_sweeper(
    store: Arc<dyn KvStore>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("KV sweeper started for {} every {:?}", store.id(), interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    match store.sweep_expired().await {
                        Ok(0) => {}
                        Ok(reclaimed) => debug!("KV sweeper reclaimed {} entries", reclaimed),
                        Err(e) => warn!("KV sweep failed: {}", e),
                    }
                }
            }
        }

        info!("KV sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;
    use scripthost_protocols::{Meta, Namespace};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_and_stops() {
        let memory = Arc::new(MemoryKvStore::new());
        let store: Arc<dyn KvStore> = memory.clone();
        let ns = Namespace::repo(&Meta::new("o", "r", "c"), ["g"]).unwrap();
        store
            .set(&ns, "k", "v".into(), Some(Duration::from_secs(1)))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = spawn_sweeper(store.clone(), Duration::from_secs(5), token.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        // Already swept: nothing left to reclaim.
        assert_eq!(store.sweep_expired().await.unwrap(), 0);

        token.cancel();
        handle.await.unwrap();
        assert_eq!(memory.namespace_count(), 1);
    }
}
