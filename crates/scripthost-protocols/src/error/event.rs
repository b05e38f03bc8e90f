//! Event bus errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error("Subscriber on topic {topic} fell behind and was detached")]
    Lagged { topic: String },

    #[error("Topic limit of {max} reached and no idle topic can be evicted")]
    TooManyTopics { max: usize },

    #[error("Topic {topic} already has {max} pull consumers")]
    TooManyConsumers { topic: String, max: usize },

    #[error("Event bus closed")]
    Closed,

    #[error("Operation cancelled")]
    Cancelled,
}
