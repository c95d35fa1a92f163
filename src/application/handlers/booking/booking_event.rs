//! BookingEventHandler - turns scheduling events into credit movements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::application::handlers::credit::{
    DeductCreditCommand, DeductCreditHandler, RefundCreditCommand, RefundCreditHandler,
};
use crate::domain::foundation::MemberId;
use crate::domain::membership::{DeductionResult, LedgerError, RefundResult};

/// Actor recorded for movements driven by the scheduler.
pub const SCHEDULER_ACTOR: &str = "scheduler";

/// A participant's place in a scheduled lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonBooking {
    pub participant_id: MemberId,
    pub lesson_id: String,
    pub scheduled_date: NaiveDate,
    pub title: String,
}

impl LessonBooking {
    /// Journal note: `"<title> (<lesson id>)"`.
    pub fn note(&self) -> String {
        format!("{} ({})", self.title, self.lesson_id)
    }
}

/// Event published by the scheduling subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "booking", rename_all = "snake_case")]
pub enum BookingEvent {
    Enrolled(LessonBooking),
    Cancelled(LessonBooking),
    Removed(LessonBooking),
    /// The whole lesson was deleted.
    Deleted(LessonBooking),
}

impl BookingEvent {
    pub fn booking(&self) -> &LessonBooking {
        match self {
            BookingEvent::Enrolled(b)
            | BookingEvent::Cancelled(b)
            | BookingEvent::Removed(b)
            | BookingEvent::Deleted(b) => b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Deducted(DeductionResult),
    Refunded(RefundResult),
}

pub struct BookingEventHandler {
    deduct: Arc<DeductCreditHandler>,
    refund: Arc<RefundCreditHandler>,
}

impl BookingEventHandler {
    pub fn new(deduct: Arc<DeductCreditHandler>, refund: Arc<RefundCreditHandler>) -> Self {
        Self { deduct, refund }
    }

    pub async fn handle(&self, event: BookingEvent) -> Result<BookingOutcome, LedgerError> {
        let booking = event.booking();
        debug!(
            member_id = %booking.participant_id,
            lesson_id = %booking.lesson_id,
            scheduled_date = %booking.scheduled_date,
            "Booking event received"
        );

        match &event {
            BookingEvent::Enrolled(booking) => self
                .deduct
                .handle(DeductCreditCommand {
                    member_id: booking.participant_id.clone(),
                    lesson_date: booking.scheduled_date,
                    note: booking.note(),
                    actor: SCHEDULER_ACTOR.to_string(),
                })
                .await
                .map(BookingOutcome::Deducted),
            BookingEvent::Cancelled(booking)
            | BookingEvent::Removed(booking)
            | BookingEvent::Deleted(booking) => self
                .refund
                .handle(RefundCreditCommand {
                    member_id: booking.participant_id.clone(),
                    lesson_date: booking.scheduled_date,
                    note: booking.note(),
                    actor: SCHEDULER_ACTOR.to_string(),
                })
                .await
                .map(BookingOutcome::Refunded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_fixture::{date, Harness};
    use crate::domain::ledger::{MovementKind, RefundFallback};
    use crate::domain::membership::MembershipStatus;

    fn handler(h: &Harness) -> BookingEventHandler {
        BookingEventHandler::new(
            Arc::new(DeductCreditHandler::new(h.writer(), h.catalog(), h.clock(), h.publisher())),
            Arc::new(RefundCreditHandler::new(
                h.writer(),
                h.catalog(),
                h.clock(),
                h.publisher(),
                RefundFallback::default(),
            )),
        )
    }

    fn booking(member_id: &MemberId) -> LessonBooking {
        LessonBooking {
            participant_id: member_id.clone(),
            lesson_id: "lesson-42".to_string(),
            scheduled_date: date(2025, 1, 15),
            title: "Reformer Basics".to_string(),
        }
    }

    #[tokio::test]
    async fn enroll_then_cancel_round_trips() {
        let h = Harness::on(date(2025, 1, 14));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;

        let enrolled = handler(&h).handle(BookingEvent::Enrolled(booking(&id))).await.unwrap();
        assert!(matches!(enrolled, BookingOutcome::Deducted(ref d) if d.remaining_in_package == 7));

        let cancelled = handler(&h).handle(BookingEvent::Cancelled(booking(&id))).await.unwrap();
        assert!(matches!(cancelled, BookingOutcome::Refunded(ref r) if r.remaining_in_package == 8));

        let stored = h.member(&id).await;
        let movements = &stored.packages[0].movements;
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].kind, MovementKind::Deduction);
        assert_eq!(movements[0].note, "Reformer Basics (lesson-42)");
        assert_eq!(movements[1].kind, MovementKind::Refund);
    }

    #[tokio::test]
    async fn lesson_deletion_refunds() {
        let h = Harness::on(date(2025, 1, 14));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 6)])
            .await;

        let outcome = handler(&h).handle(BookingEvent::Deleted(booking(&id))).await.unwrap();

        assert!(matches!(outcome, BookingOutcome::Refunded(_)));
        assert_eq!(h.member(&id).await.remaining_classes_aggregate, 7);
    }

    #[test]
    fn events_deserialize_from_scheduler_json() {
        let json = r#"{
            "type": "removed",
            "booking": {
                "participantId": "m-9",
                "lessonId": "lesson-1",
                "scheduledDate": "2025-03-04",
                "title": "Mat Flow"
            }
        }"#;
        let event: BookingEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, BookingEvent::Removed(_)));
        assert_eq!(event.booking().note(), "Mat Flow (lesson-1)");
    }
}
