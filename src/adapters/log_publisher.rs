//! Event publisher that writes ledger events to the tracing pipeline.
//!
//! Used by the binary when no message transport is configured, so committed
//! ledger changes still leave an audit line.

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::{DomainError, EventEnvelope};
use crate::ports::EventPublisher;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        info!(
            target: "lesson_ledger::events",
            event_id = %event.event_id.as_str(),
            event_type = %event.event_type,
            member_id = %event.aggregate_id,
            actor = event.metadata.actor.as_deref().unwrap_or("-"),
            correlation_id = event.metadata.correlation_id.as_deref().unwrap_or("-"),
            payload = %event.payload,
            "Ledger event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{EventMetadata, MemberId, Timestamp};
    use crate::domain::membership::LedgerEvent;

    #[tokio::test]
    async fn publishing_always_succeeds() {
        let event = LedgerEvent::AggregateCorrected {
            member_id: MemberId::new("m-1").unwrap(),
            previous: 2,
            corrected: 1,
            occurred_at: Timestamp::now(),
        };
        assert!(LogEventPublisher.publish(event.to_envelope(EventMetadata::default())).await.is_ok());
    }
}
