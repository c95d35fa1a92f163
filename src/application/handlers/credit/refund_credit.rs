//! RefundCreditHandler - gives a lesson back when a booking is cancelled.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use super::deduct_credit::legacy_migrated;
use crate::application::publishing::publish_events;
use crate::application::legacy::{migrate_in_place, prefetch_legacy_entry};
use crate::application::MemberRecordWriter;
use crate::domain::foundation::MemberId;
use crate::domain::ledger::{MigrationOutcome, RefundFallback};
use crate::domain::membership::{LedgerError, LedgerEvent, RefundResult};
use crate::ports::{Clock, EventPublisher, PackageCatalog};

#[derive(Debug, Clone)]
pub struct RefundCreditCommand {
    pub member_id: MemberId,
    /// Date of the cancelled lesson.
    pub lesson_date: NaiveDate,
    pub note: String,
    pub actor: String,
}

pub struct RefundCreditHandler {
    writer: Arc<MemberRecordWriter>,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
    fallback: RefundFallback,
}

impl RefundCreditHandler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        catalog: Arc<dyn PackageCatalog>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
        fallback: RefundFallback,
    ) -> Self {
        Self {
            writer,
            catalog,
            clock,
            event_publisher,
            fallback,
        }
    }

    pub async fn handle(&self, cmd: RefundCreditCommand) -> Result<RefundResult, LedgerError> {
        let legacy_entry = prefetch_legacy_entry(&self.writer, self.catalog.as_ref(), &cmd.member_id).await?;
        let now = self.clock.timestamp();
        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                let migration = migrate_in_place(member, legacy_entry.as_ref(), now);
                let refund = member.refund_credit(cmd.lesson_date, &cmd.note, self.fallback, now)?;
                Ok((migration, refund))
            })
            .await?;
        let (migration, refund) = committed.value;

        let mut events = Vec::with_capacity(2);
        if let MigrationOutcome::Migrated { package_id } = migration {
            events.push(legacy_migrated(&committed.member, package_id, now));
        }

        if refund.capped {
            warn!(
                member_id = %cmd.member_id,
                package_id = %refund.package_id,
                lesson_date = %cmd.lesson_date,
                "Refund target already full, credit not restored"
            );
        } else {
            info!(
                member_id = %cmd.member_id,
                package_id = %refund.package_id,
                lesson_date = %cmd.lesson_date,
                basis = ?refund.basis,
                remaining = refund.remaining_in_package,
                aggregate = refund.aggregate,
                "Lesson credit refunded"
            );
            events.push(LedgerEvent::CreditRefunded {
                member_id: cmd.member_id.clone(),
                package_id: refund.package_id,
                lesson_date: refund.lesson_date,
                note: cmd.note,
                basis: refund.basis,
                remaining_in_package: refund.remaining_in_package,
                aggregate: refund.aggregate,
                occurred_at: now,
            });
        }
        publish_events(self.event_publisher.as_ref(), events, &cmd.actor).await;

        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::credit::{DeductCreditCommand, DeductCreditHandler};
    use crate::application::test_fixture::{date, Harness};
    use crate::domain::ledger::RefundBasis;
    use crate::domain::membership::MembershipStatus;

    fn command(member_id: &MemberId, day: NaiveDate) -> RefundCreditCommand {
        RefundCreditCommand {
            member_id: member_id.clone(),
            lesson_date: day,
            note: "Mat Flow (lesson-9)".to_string(),
            actor: "scheduler".to_string(),
        }
    }

    fn handler(h: &Harness, fallback: RefundFallback) -> RefundCreditHandler {
        RefundCreditHandler::new(h.writer(), h.catalog(), h.clock(), h.publisher(), fallback)
    }

    #[tokio::test]
    async fn deduct_then_refund_restores_balances() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member(
                "m-1",
                MembershipStatus::Active,
                &[
                    (date(2025, 1, 1), date(2025, 1, 31), 8, 3),
                    (date(2025, 1, 1), date(2025, 2, 28), 8, 8),
                ],
            )
            .await;
        let before = h.member(&id).await;

        DeductCreditHandler::new(h.writer(), h.catalog(), h.clock(), h.publisher())
            .handle(DeductCreditCommand {
                member_id: id.clone(),
                lesson_date: date(2025, 1, 20),
                note: "Mat Flow (lesson-9)".to_string(),
                actor: "scheduler".to_string(),
            })
            .await
            .unwrap();
        let refund = handler(&h, RefundFallback::default())
            .handle(command(&id, date(2025, 1, 20)))
            .await
            .unwrap();

        assert_eq!(refund.basis, RefundBasis::OutstandingDeduction);
        let after = h.member(&id).await;
        assert_eq!(after.remaining_classes_aggregate, before.remaining_classes_aggregate);
        for (a, b) in after.packages.iter().zip(before.packages.iter()) {
            assert_eq!(a.remaining_lessons, b.remaining_lessons);
            assert_eq!(a.expiry_date, b.expiry_date);
        }
        assert!(h.bus.has_event("credit.refunded.v1").await);
    }

    #[tokio::test]
    async fn refund_is_allowed_while_frozen() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Frozen, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 5)])
            .await;

        let refund = handler(&h, RefundFallback::default())
            .handle(command(&id, date(2025, 1, 12)))
            .await
            .unwrap();

        assert_eq!(refund.remaining_in_package, 6);
        assert_eq!(h.member(&id).await.remaining_classes_aggregate, 6);
    }

    #[tokio::test]
    async fn uncovered_date_uses_fallback_when_enabled() {
        let h = Harness::on(date(2025, 3, 1));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 2, 1), date(2025, 2, 28), 8, 5)])
            .await;

        let refund = handler(&h, RefundFallback::MostRecentActive)
            .handle(command(&id, date(2025, 1, 10)))
            .await
            .unwrap();

        assert_eq!(refund.basis, RefundBasis::FallbackMostRecent);
        assert_eq!(refund.remaining_in_package, 6);
    }

    #[tokio::test]
    async fn uncovered_date_is_rejected_when_fallback_disabled() {
        let h = Harness::on(date(2025, 3, 1));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 2, 1), date(2025, 2, 28), 8, 5)])
            .await;

        let err = handler(&h, RefundFallback::Disabled)
            .handle(command(&id, date(2025, 1, 10)))
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::NoPackageForDate { date: date(2025, 1, 10) });
        assert_eq!(h.repo.save_count(), 0);
    }

    #[tokio::test]
    async fn refund_into_full_package_writes_nothing() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;

        let refund = handler(&h, RefundFallback::default())
            .handle(command(&id, date(2025, 1, 15)))
            .await
            .unwrap();

        assert!(refund.capped);
        assert_eq!(refund.remaining_in_package, 8);
        assert_eq!(h.repo.save_count(), 0);
        assert!(!h.bus.has_event("credit.refunded.v1").await);
    }
}
