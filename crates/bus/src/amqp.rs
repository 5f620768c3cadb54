//! AMQP publisher for brokered deployments.
//!
//! Declares the exchange as a non-durable topic exchange and publishes each
//! envelope's JSON payload with the routing key as topic. Expiry is carried
//! as the per-message `expiration` property so the broker drops stale
//! updates itself.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tracing::{debug, info, instrument};

use crate::error::BusError;
use crate::message::Message;
use crate::traits::EventPublisher;

/// AMQP delivery mode for messages that do not survive a broker restart.
const TRANSIENT: u8 = 1;
const PERSISTENT: u8 = 2;

/// Whether `endpoint` names an AMQP broker rather than a ZeroMQ socket.
pub fn is_amqp_endpoint(endpoint: &str) -> bool {
    endpoint.starts_with("amqp://") || endpoint.starts_with("amqps://")
}

/// Publishes onto an AMQP exchange over a single channel.
pub struct AmqpPublisher {
    channel: Channel,
}

impl AmqpPublisher {
    /// Connect, open a channel and declare `exchange` (topic, non-durable).
    #[instrument(skip_all, fields(exchange = %exchange))]
    pub async fn connect(uri: &str, exchange: &str) -> Result<Self, BusError> {
        let conn = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;
        channel
            .exchange_declare(
                exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: false,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        info!("declared AMQP topic exchange");
        Ok(Self { channel })
    }
}

/// Message properties for an envelope: content type, delivery mode, id,
/// timestamp and, when the envelope expires, the remaining lifetime in
/// milliseconds.
pub fn properties(message: &Message) -> BasicProperties {
    let mut props = BasicProperties::default()
        .with_content_type(message.content_type.as_str().into())
        .with_delivery_mode(if message.persistent { PERSISTENT } else { TRANSIENT })
        .with_message_id(message.correlation_id.to_string().into())
        .with_timestamp(message.timestamp.timestamp().max(0) as u64);

    if let Some(expires_at) = message.expires_at {
        let ttl_ms = (expires_at - message.timestamp).num_milliseconds().max(0);
        props = props.with_expiration(ttl_ms.to_string().into());
    }
    props
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        self.channel
            .basic_publish(
                &message.exchange,
                &message.topic,
                BasicPublishOptions::default(),
                &message.payload,
                properties(&message),
            )
            .await?;
        debug!(exchange = %message.exchange, topic = %message.topic, "published AMQP message");
        Ok(())
    }
}
