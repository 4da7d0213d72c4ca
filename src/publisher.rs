//! Domain event publishing.
//!
//! Events go to NATS when a client is configured and are logged otherwise.
//! Publishing runs after the write has committed; a failure is logged and
//! never surfaces to the caller.

use crate::domain::events::DomainEvent;

pub const SUBJECT_PREFIX: &str = "ecommerce";

#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub fn subject(event: &DomainEvent) -> String { format!("{SUBJECT_PREFIX}.{}", event.name()) }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = Self::subject(&event);
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, ?event, "no broker configured, event not forwarded");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = ?e, %subject, "failed to serialize domain event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(error = ?e, %subject, "failed to publish domain event");
        }
    }
}
