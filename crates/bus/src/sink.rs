//! Opens the configured publish sink.

use std::sync::Arc;

use tmplsync_core::config::BusConfig;

use crate::amqp::{is_amqp_endpoint, AmqpPublisher};
use crate::error::BusError;
use crate::pubsub::ZmqPublisher;
use crate::traits::EventPublisher;
use crate::transport::Transport;

/// `amqp://` endpoints get a broker connection with the exchange declared;
/// anything else is a ZeroMQ PUB socket, bound or connected per `bind`.
pub async fn open_sink(config: &BusConfig) -> Result<Arc<dyn EventPublisher>, BusError> {
    if is_amqp_endpoint(&config.endpoint) {
        let publisher = AmqpPublisher::connect(&config.endpoint, &config.exchange).await?;
        return Ok(Arc::new(publisher));
    }

    let transport = Transport::parse(&config.endpoint)?;
    let publisher = if config.bind {
        ZmqPublisher::bind(&transport).await?
    } else {
        ZmqPublisher::connect(&transport).await?
    };
    Ok(Arc::new(publisher))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(endpoint: &str, bind: bool) -> BusConfig {
        BusConfig {
            endpoint: endpoint.into(),
            bind,
            exchange: "templates".into(),
            routing_key: "templates.update".into(),
            message_ttl_secs: 3600,
        }
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let err = open_sink(&bus("http://localhost:5672", false)).await.err().unwrap();
        assert!(matches!(err, BusError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn tcp_endpoint_binds_a_zmq_socket() {
        assert!(open_sink(&bus("tcp://127.0.0.1:16310", true)).await.is_ok());
    }
}
