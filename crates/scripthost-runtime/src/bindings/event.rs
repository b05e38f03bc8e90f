//! `event.*`.

use std::future::Future;

use futures::FutureExt;
use scripthost_event::{ConsumerId, EventBus, Subscription};
use scripthost_protocols::{EventError, ScriptError};
use tracing::debug;

use crate::context::ExecutionContext;

/// The `event` binding of one invocation.
#[derive(Clone)]
pub struct EventBinding {
    bus: EventBus,
    context: ExecutionContext,
}

impl EventBinding {
    pub(crate) fn new(bus: EventBus, context: ExecutionContext) -> Self {
        Self { bus, context }
    }

    pub(crate) fn consumer(&self) -> ConsumerId {
        ConsumerId::context(self.context.id())
    }

    pub async fn put(&self, topic: &str, payload: impl Into<String>) -> Result<(), ScriptError> {
        self.context.ensure_active()?;
        self.bus.put(topic, payload)?;
        Ok(())
    }

    /// Latest payload of `topic`, waiting for the first one if needed.
    pub async fn load(&self, topic: &str) -> Result<String, ScriptError> {
        self.context.ensure_active()?;
        self.bus
            .load(topic, self.context.token())
            .await
            .map_err(ScriptError::from)
    }

    /// Next payload this invocation has not consumed yet.
    pub async fn pull(&self, topic: &str) -> Result<String, ScriptError> {
        self.context.ensure_active()?;
        self.bus
            .pull(topic, &self.consumer(), self.context.token())
            .await
            .map_err(ScriptError::from)
    }

    /// Like [`EventBinding::pull`] but with a durable consumer name.
    pub async fn pull_as(&self, topic: &str, consumer: &str) -> Result<String, ScriptError> {
        self.context.ensure_active()?;
        self.bus
            .pull_as(topic, consumer, self.context.token())
            .await
            .map_err(ScriptError::from)
    }

    /// Start a push subscription; attach a handler with [`SubscribeBuilder::on`].
    pub fn subscribe(&self, topic: &str) -> Result<SubscribeBuilder, ScriptError> {
        self.context.ensure_active()?;
        let subscription = self.bus.subscribe(topic)?;
        Ok(SubscribeBuilder {
            subscription,
            context: self.context.clone(),
        })
    }
}

/// A registered subscription waiting for its handler.
pub struct SubscribeBuilder {
    subscription: Subscription,
    context: ExecutionContext,
}

impl SubscribeBuilder {
    /// Run `handler` for every payload, in publish order, on the invocation's
    /// own schedule. Returns without waiting.
    ///
    /// The subscription lives until the invocation ends. A handler error, or
    /// the subscription falling behind, fails the invocation.
    pub fn on<F, Fut>(self, mut handler: F) -> Result<(), ScriptError>
    where
        F: FnMut(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ScriptError>> + Send + 'static,
    {
        let SubscribeBuilder {
            mut subscription,
            context,
        } = self;
        let name = format!("subscribe:{}", subscription.topic());
        let driver_context = context.clone();

        let driver = async move {
            loop {
                let payload = tokio::select! {
                    biased;
                    _ = driver_context.cancelled() => break,
                    payload = subscription.recv() => payload,
                };
                match payload {
                    Ok(payload) => handler(payload).await?,
                    Err(EventError::Closed) => break,
                    Err(e) => return Err(ScriptError::from(e)),
                }
            }
            debug!(subscription = %subscription.id(), "Subscription driver finished");
            Ok(())
        };

        context.schedule(name, driver.boxed())
    }

    /// Take the raw subscription and drive it yourself.
    pub fn into_subscription(self) -> Subscription {
        self.subscription
    }
}
