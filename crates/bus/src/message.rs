use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content type of every payload this crate produces.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Wire-format message envelope.
///
/// The envelope itself is MessagePack; the payload is JSON so that any
/// subscriber can read it without sharing Rust types. `topic` carries the
/// routing key used for PUB/SUB prefix filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Exchange the message was published on (e.g. "templates").
    pub exchange: String,

    /// Routing key for PUB/SUB filtering (e.g. "templates.update").
    pub topic: String,

    /// JSON-encoded payload bytes.
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,

    pub content_type: String,

    /// When this message was enqueued.
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for tracing a template through downstream consumers.
    pub correlation_id: Uuid,

    /// Schema version for forward-compatible evolution.
    #[serde(default = "default_version")]
    pub version: u16,

    /// Whether the message should survive a broker restart. Template updates
    /// never do.
    #[serde(default)]
    pub persistent: bool,

    /// Messages past this instant may be dropped without being consumed.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Default version for messages that omit the field (backward compat).
fn default_version() -> u16 {
    1
}

impl Message {
    /// Create a new non-persistent message, serializing the payload as JSON.
    pub fn json<T: Serialize>(
        exchange: impl Into<String>,
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            exchange: exchange.into(),
            topic: topic.into(),
            payload: serde_json::to_vec(payload)?,
            content_type: JSON_CONTENT_TYPE.to_string(),
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4(),
            version: 1,
            persistent: false,
            expires_at: None,
        })
    }

    /// Expire the message `ttl` after its enqueue timestamp.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.timestamp.checked_add_signed(ttl));
        self
    }

    /// Whether the message has outlived its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Deserialize the JSON payload into the expected type.
    pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Serialize this entire message envelope to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Deserialize a message envelope from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// Helper module for serde to handle `Vec<u8>` as raw bytes in MessagePack.
mod serde_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let bytes: &[u8] = Deserialize::deserialize(d)?;
        Ok(bytes.to_vec())
    }
}
