//! Post-commit event publication.

use tracing::warn;
use uuid::Uuid;

use crate::domain::foundation::EventMetadata;
use crate::domain::membership::LedgerEvent;
use crate::ports::EventPublisher;

/// Fresh correlation id for one batch run.
pub(crate) fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Publishes events for a write that has already committed.
///
/// Failures are logged and dropped: the ledger record is the source of
/// truth and is never rolled back because a subscriber missed an event.
pub(crate) async fn publish_events(publisher: &dyn EventPublisher, events: Vec<LedgerEvent>, actor: &str) {
    publish_with(publisher, events, EventMetadata::by(actor)).await;
}

/// Same as `publish_events`, tagging every event with the batch run id.
pub(crate) async fn publish_run_events(
    publisher: &dyn EventPublisher,
    events: Vec<LedgerEvent>,
    actor: &str,
    run_id: &str,
) {
    publish_with(publisher, events, EventMetadata::by(actor).correlated(run_id)).await;
}

async fn publish_with(publisher: &dyn EventPublisher, events: Vec<LedgerEvent>, metadata: EventMetadata) {
    for event in events {
        let event_type = event.event_type();
        let member_id = event.member_id().clone();
        if let Err(e) = publisher.publish(event.to_envelope(metadata.clone())).await {
            warn!(
                event_type,
                member_id = %member_id,
                error = %e,
                "Failed to publish ledger event"
            );
        }
    }
}
