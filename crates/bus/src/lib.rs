//! Message bus for outbound template updates.
//!
//! Templates leave the worker as [`Message`] envelopes, either on a ZeroMQ
//! PUB socket or on an AMQP topic exchange. The envelope carries the exchange name, routing key and an
//! expiry so downstream subscribers can discard stale updates.

pub mod amqp;
pub mod error;
pub mod message;
pub mod publisher;
pub mod pubsub;
pub mod sink;
pub mod topics;
pub mod traits;
pub mod transport;

pub use amqp::{is_amqp_endpoint, AmqpPublisher};
pub use error::BusError;
pub use message::Message;
pub use publisher::TemplatePublisher;
pub use pubsub::{ZmqPublisher, ZmqSubscriber};
pub use sink::open_sink;
pub use traits::{EventPublisher, EventSubscriber};
pub use transport::Transport;
