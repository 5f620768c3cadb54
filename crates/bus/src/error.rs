use thiserror::Error;

/// Errors that can occur in the message bus layer.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("envelope serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("envelope deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("payload encoding error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
