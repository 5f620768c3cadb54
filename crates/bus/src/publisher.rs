//! Publishes canonical templates onto the templates exchange.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use tmplsync_core::config::BusConfig;
use tmplsync_core::CanonicalTemplate;

use crate::error::BusError;
use crate::message::Message;
use crate::topics;
use crate::traits::EventPublisher;

/// Default lifetime of a template update on the exchange.
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(60 * 60);

/// Emits one non-persistent, expiring message per canonical template.
///
/// Delivery is at-most-once: no acknowledgement is awaited and failures are
/// returned to the caller rather than retried.
#[derive(Clone)]
pub struct TemplatePublisher {
    sink: Arc<dyn EventPublisher>,
    exchange: String,
    routing_key: String,
    ttl: Duration,
}

impl TemplatePublisher {
    /// Publisher on the default exchange and routing key with a one-hour TTL.
    pub fn new(sink: Arc<dyn EventPublisher>) -> Self {
        Self {
            sink,
            exchange: topics::TEMPLATES_EXCHANGE.to_string(),
            routing_key: topics::TEMPLATES_UPDATE.to_string(),
            ttl: DEFAULT_MESSAGE_TTL,
        }
    }

    pub fn from_config(sink: Arc<dyn EventPublisher>, config: &BusConfig) -> Self {
        Self {
            sink,
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
            ttl: config.message_ttl(),
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub async fn publish(&self, template: &CanonicalTemplate) -> Result<(), BusError> {
        let message = Message::json(&self.exchange, &self.routing_key, template)?.with_ttl(self.ttl);
        let correlation_id = message.correlation_id;
        self.sink.publish(message).await?;
        debug!(
            external_id = %template.external_id,
            %correlation_id,
            routing_key = %self.routing_key,
            "published template"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Mock publisher that records published messages.
    struct MockPublisher {
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl EventPublisher for MockPublisher {
        async fn publish(&self, message: Message) -> Result<(), BusError> {
            self.messages.lock().await.push(message);
            Ok(())
        }
    }

    struct ClosedChannel;

    #[async_trait]
    impl EventPublisher for ClosedChannel {
        async fn publish(&self, _message: Message) -> Result<(), BusError> {
            Err(BusError::Transport("channel closed".into()))
        }
    }

    fn template(id: &str) -> CanonicalTemplate {
        CanonicalTemplate {
            external_id: id.into(),
            name: Some(format!("Template {id}")),
            description: None,
            modified: None,
            created: None,
            sections: Vec::new(),
        }
    }

    #[tokio::test]
    async fn publishes_json_with_one_hour_expiry() {
        let sink = Arc::new(MockPublisher { messages: Mutex::new(Vec::new()) });
        let publisher = TemplatePublisher::new(sink.clone());

        publisher.publish(&template("B")).await.unwrap();

        let messages = sink.messages.lock().await;
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.exchange, "templates");
        assert_eq!(msg.topic, "templates.update");
        assert!(!msg.persistent);
        assert_eq!(
            msg.expires_at.unwrap() - msg.timestamp,
            chrono::Duration::hours(1)
        );
        let body: CanonicalTemplate = msg.decode().unwrap();
        assert_eq!(body, template("B"));
    }

    #[tokio::test]
    async fn honours_configured_routing() {
        let sink = Arc::new(MockPublisher { messages: Mutex::new(Vec::new()) });
        let config = BusConfig {
            endpoint: "tcp://127.0.0.1:1".into(),
            bind: false,
            exchange: "surveys".into(),
            routing_key: "surveys.templates".into(),
            message_ttl_secs: 120,
        };
        let publisher = TemplatePublisher::from_config(sink.clone(), &config);
        assert_eq!(publisher.routing_key(), "surveys.templates");

        publisher.publish(&template("C")).await.unwrap();

        let messages = sink.messages.lock().await;
        assert_eq!(messages[0].exchange, "surveys");
        assert_eq!(
            messages[0].expires_at.unwrap() - messages[0].timestamp,
            chrono::Duration::seconds(120)
        );
    }

    #[tokio::test]
    async fn sink_failures_propagate() {
        let publisher = TemplatePublisher::new(Arc::new(ClosedChannel));
        let err = publisher.publish(&template("D")).await.unwrap_err();
        assert!(matches!(err, BusError::Transport(_)));
    }
}
