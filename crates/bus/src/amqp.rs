use async_trait::async_trait;
use bytes::Bytes;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions},
    types::{FieldTable, ShortString},
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{transport_error, BrokerOptions, PublishError, Publisher, CONTENT_TYPE_JSON};

/// Publishes to RabbitMQ fanout exchanges with an empty routing key.
///
/// One connection and one confirm-mode channel are shared by every request.
/// A publish completes once the broker acknowledges the message.
#[derive(Clone)]
pub struct AmqpPublisher {
    _connection: Arc<Connection>,
    channel: Channel,
}

impl AmqpPublisher {
    pub async fn connect(options: &BrokerOptions) -> Result<Self, PublishError> {
        let connection = Connection::connect(&options.url, ConnectionProperties::default())
            .await
            .map_err(|err| PublishError::Connect(err.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|err| PublishError::Connect(err.to_string()))?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|err| PublishError::Connect(err.to_string()))?;

        for exchange in options.exchanges.iter().filter(|name| !name.is_empty()) {
            declare_fanout(&channel, exchange).await?;
        }

        Ok(Self {
            _connection: Arc::new(connection),
            channel,
        })
    }
}

/// Non-durable, not auto-deleted fanout exchange.
async fn declare_fanout(channel: &Channel, exchange: &str) -> Result<(), PublishError> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|err| PublishError::Declare {
            exchange: exchange.to_string(),
            reason: err.to_string(),
        })?;
    info!(stage = "publish", broker = "amqp", exchange, "exchange declared");
    Ok(())
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(&self, exchange: &str, payload: Bytes) -> Result<(), PublishError> {
        if exchange.is_empty() {
            return Err(PublishError::InvalidExchange);
        }
        let properties =
            BasicProperties::default().with_content_type(ShortString::from(CONTENT_TYPE_JSON));
        let confirmation = self
            .channel
            .basic_publish(
                exchange,
                "",
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|err| transport_error(exchange, err))?
            .await
            .map_err(|err| transport_error(exchange, err))?;
        if confirmation.is_nack() {
            return Err(transport_error(exchange, "broker rejected the message"));
        }

        debug!(stage = "publish", broker = "amqp", exchange, size_bytes = payload.len(), "event published");
        Ok(())
    }
}
