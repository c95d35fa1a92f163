//! In-memory event bus.
//!
//! Captures published envelopes for assertions. Can be switched into a
//! failing mode to check that publication errors never undo a write.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    published: Arc<RwLock<Vec<EventEnvelope>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail.
    pub fn fail_publishing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    // === Test Helpers ===

    pub async fn published_events(&self) -> Vec<EventEnvelope> {
        self.published.read().await.clone()
    }

    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.published
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub async fn event_count(&self) -> usize {
        self.published.read().await.len()
    }

    pub async fn has_event(&self, event_type: &str) -> bool {
        self.published
            .read()
            .await
            .iter()
            .any(|e| e.event_type == event_type)
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::InternalError,
                format!("Event bus unavailable for {}", event.event_type),
            ));
        }
        self.published.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use serde_json::json;

    fn envelope(event_type: &str) -> EventEnvelope {
        EventEnvelope::new(event_type, "m-1", "Member", Timestamp::now(), json!({}))
    }

    #[tokio::test]
    async fn captures_published_events() {
        let bus = InMemoryEventBus::new();
        bus.publish_all(vec![envelope("credit.deducted.v1"), envelope("credit.refunded.v1")])
            .await
            .unwrap();

        assert_eq!(bus.event_count().await, 2);
        assert!(bus.has_event("credit.refunded.v1").await);
        assert_eq!(bus.events_of_type("credit.deducted.v1").await.len(), 1);

        bus.clear().await;
        assert_eq!(bus.event_count().await, 0);
    }

    #[tokio::test]
    async fn failing_mode_rejects_and_records_nothing() {
        let bus = InMemoryEventBus::new();
        bus.fail_publishing(true);

        assert!(bus.publish(envelope("member.frozen.v1")).await.is_err());
        assert_eq!(bus.event_count().await, 0);
    }
}
