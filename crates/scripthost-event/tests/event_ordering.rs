//! Ordering and delivery guarantees across concurrent publishers and readers.

use std::time::Duration;

use scripthost_config::EventConfig;
use scripthost_event::{ConsumerId, EventBus};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscription_preserves_publish_order() {
    let bus = EventBus::new(EventConfig {
        retention: 64,
        subscriber_backlog: 2048,
        ..Default::default()
    });
    let mut sub = bus.subscribe("ordered").unwrap();

    let publisher = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for i in 0..1000 {
                bus.put("ordered", i.to_string()).unwrap();
                if i % 100 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    for expected in 0..1000 {
        assert_eq!(sub.recv().await.unwrap(), expected.to_string());
    }
    publisher.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_competing_pulls_on_one_consumer_never_duplicate() {
    let bus = EventBus::new(EventConfig {
        retention: 4096,
        subscriber_backlog: 16,
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    let consumer = ConsumerId::named("pool");

    // Pin the consumer's start position before anything is published.
    let _ = tokio::time::timeout(
        Duration::from_millis(10),
        bus.pull("work", &consumer, &cancel),
    )
    .await;

    for i in 0..200 {
        bus.put("work", i.to_string()).unwrap();
    }

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let bus = bus.clone();
            let cancel = cancel.clone();
            let consumer = consumer.clone();
            tokio::spawn(async move {
                let mut got = Vec::new();
                for _ in 0..50 {
                    let payload = bus.pull("work", &consumer, &cancel).await.unwrap();
                    got.push(payload.parse::<u32>().unwrap());
                }
                got
            })
        })
        .collect();

    let mut all = Vec::new();
    for reader in futures::future::join_all(readers).await {
        let got = reader.unwrap();
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        all.extend(got);
    }
    all.sort_unstable();
    assert_eq!(all, (0..200).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_pull_and_subscribe_share_one_log() {
    let bus = EventBus::default();
    let cancel = CancellationToken::new();
    let consumer = ConsumerId::context("ctx");
    let _ = tokio::time::timeout(Duration::from_millis(10), bus.pull("t", &consumer, &cancel)).await;
    let mut sub = bus.subscribe("t").unwrap();

    bus.put("t", "p1").unwrap();
    bus.put("t", "p2").unwrap();

    assert_eq!(sub.recv().await.unwrap(), "p1");
    assert_eq!(bus.pull("t", &consumer, &cancel).await.unwrap(), "p1");
    assert_eq!(bus.load("t", &cancel).await.unwrap(), "p2");
    assert_eq!(sub.recv().await.unwrap(), "p2");
    assert_eq!(bus.pull("t", &consumer, &cancel).await.unwrap(), "p2");
}
