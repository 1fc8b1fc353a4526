//! Publisher port used by the webhook adapters to hand canonical events to the
//! message broker. RabbitMQ (AMQP 0-9-1) and NATS back the port in
//! production; [`InMemoryPublisher`] records messages for tests.

mod amqp;
mod nats;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Mutex;

pub use amqp::AmqpPublisher;
pub use nats::NatsPublisher;

const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors raised while handing an event to the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),
    #[error("failed to declare exchange '{exchange}': {reason}")]
    Declare { exchange: String, reason: String },
    #[error("exchange name must not be empty")]
    InvalidExchange,
    #[error("failed to publish to exchange '{exchange}': {reason}")]
    Transport { exchange: String, reason: String },
}

/// Destination for serialized canonical events.
///
/// Implementations are shared by every in-flight request and must tolerate
/// concurrent calls.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<(), PublishError>;
}

/// Broker address and the exchanges the gateway publishes to.
#[derive(Debug, Clone, Default)]
pub struct BrokerOptions {
    /// Connection URL, credentials included.
    pub url: String,
    /// Declared as non-durable fanout exchanges at connect time (AMQP only).
    pub exchanges: Vec<String>,
}

fn transport_error(exchange: &str, err: impl std::fmt::Display) -> PublishError {
    PublishError::Transport {
        exchange: exchange.to_string(),
        reason: err.to_string(),
    }
}

/// Message captured by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub payload: Bytes,
}

/// Recording publisher for tests and dry runs.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    failure: Option<String>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every call fails with a transport error.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            published: Arc::default(),
            failure: Some(reason.into()),
        }
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    pub async fn take_published(&self) -> Vec<PublishedMessage> {
        let mut guard = self.published.lock().await;
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<(), PublishError> {
        if exchange.is_empty() {
            return Err(PublishError::InvalidExchange);
        }
        if let Some(reason) = &self.failure {
            return Err(PublishError::Transport {
                exchange: exchange.to_string(),
                reason: reason.clone(),
            });
        }
        self.published.lock().await.push(PublishedMessage {
            exchange: exchange.to_string(),
            payload,
        });
        Ok(())
    }
}
