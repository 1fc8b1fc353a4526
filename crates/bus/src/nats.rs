use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::{transport_error, BrokerOptions, PublishError, Publisher, CONTENT_TYPE_JSON};

/// Publishes to NATS, treating the exchange name as the subject.
///
/// NATS subjects fan out to every subscriber, matching a fanout exchange.
#[derive(Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    /// Opens the single shared broker connection. Credentials embedded in the
    /// URL are used for authentication.
    pub async fn connect(options: &BrokerOptions) -> Result<Self, PublishError> {
        let client = async_nats::ConnectOptions::new()
            .name("webhookd")
            .connect(options.url.as_str())
            .await
            .map_err(|err| PublishError::Connect(err.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Publisher for NatsPublisher {
    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<(), PublishError> {
        if exchange.is_empty() {
            return Err(PublishError::InvalidExchange);
        }
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Content-Type", CONTENT_TYPE_JSON);
        let size = payload.len();
        self.client
            .publish_with_headers(exchange.to_string(), headers, payload)
            .await
            .map_err(|err| transport_error(exchange, err))?;
        // Publishing only buffers; flush so broker failures reach the caller.
        self.client
            .flush()
            .await
            .map_err(|err| transport_error(exchange, err))?;

        debug!(stage = "publish", broker = "nats", exchange, size_bytes = size, "event published");
        Ok(())
    }
}
