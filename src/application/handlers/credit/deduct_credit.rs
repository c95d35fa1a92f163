//! DeductCreditHandler - consumes one lesson for a booking.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::application::publishing::publish_events;
use crate::application::legacy::{migrate_in_place, prefetch_legacy_entry};
use crate::application::MemberRecordWriter;
use crate::domain::foundation::{MemberId, PackageId, Timestamp};
use crate::domain::ledger::MigrationOutcome;
use crate::domain::membership::{DeductionResult, LedgerError, LedgerEvent, Member};
use crate::ports::{Clock, EventPublisher, PackageCatalog};

#[derive(Debug, Clone)]
pub struct DeductCreditCommand {
    pub member_id: MemberId,
    pub lesson_date: NaiveDate,
    /// Journal note, usually the lesson title and id.
    pub note: String,
    pub actor: String,
}

pub struct DeductCreditHandler {
    writer: Arc<MemberRecordWriter>,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl DeductCreditHandler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        catalog: Arc<dyn PackageCatalog>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            writer,
            catalog,
            clock,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: DeductCreditCommand) -> Result<DeductionResult, LedgerError> {
        let legacy_entry = prefetch_legacy_entry(&self.writer, self.catalog.as_ref(), &cmd.member_id).await?;
        let now = self.clock.timestamp();
        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                let migration = migrate_in_place(member, legacy_entry.as_ref(), now);
                let deduction = member.deduct_credit(cmd.lesson_date, &cmd.note, now)?;
                Ok((migration, deduction))
            })
            .await?;
        let (migration, deduction) = committed.value;

        info!(
            member_id = %cmd.member_id,
            package_id = %deduction.package_id,
            lesson_date = %cmd.lesson_date,
            remaining = deduction.remaining_in_package,
            aggregate = deduction.aggregate,
            attempts = committed.attempts,
            "Lesson credit deducted"
        );

        let mut events = Vec::with_capacity(2);
        if let MigrationOutcome::Migrated { package_id } = migration {
            events.push(legacy_migrated(&committed.member, package_id, now));
        }
        events.push(LedgerEvent::CreditDeducted {
            member_id: cmd.member_id.clone(),
            package_id: deduction.package_id,
            lesson_date: deduction.lesson_date,
            note: cmd.note,
            remaining_in_package: deduction.remaining_in_package,
            aggregate: deduction.aggregate,
            occurred_at: now,
        });
        publish_events(self.event_publisher.as_ref(), events, &cmd.actor).await;

        Ok(deduction)
    }
}

/// Event for a package synthesized from legacy fields.
pub(crate) fn legacy_migrated(member: &Member, package_id: PackageId, now: Timestamp) -> LedgerEvent {
    LedgerEvent::LegacyMigrated {
        member_id: member.id.clone(),
        package_id,
        remaining_lessons: member.package(&package_id).map_or(0, |p| p.remaining_lessons),
        occurred_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_fixture::{date, Harness};
    use crate::application::WritePolicy;
    use crate::domain::foundation::CatalogPackageId;
    use crate::domain::ledger::{CatalogPackage, PackageType};
    use std::time::Duration;
    use crate::domain::membership::MembershipStatus;

    fn command(member_id: &MemberId, day: NaiveDate) -> DeductCreditCommand {
        DeductCreditCommand {
            member_id: member_id.clone(),
            lesson_date: day,
            note: "Reformer Basics (lesson-1)".to_string(),
            actor: "scheduler".to_string(),
        }
    }

    fn handler(h: &Harness) -> DeductCreditHandler {
        DeductCreditHandler::new(h.writer(), h.catalog(), h.clock(), h.publisher())
    }

    #[tokio::test]
    async fn deducts_and_publishes() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;

        let result = handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap();

        assert_eq!(result.remaining_in_package, 7);
        assert_eq!(result.aggregate, 7);
        let stored = h.member(&id).await;
        assert_eq!(stored.remaining_classes_aggregate, 7);
        assert_eq!(stored.packages[0].movements.len(), 1);
        assert!(h.bus.has_event("credit.deducted.v1").await);
    }

    #[tokio::test]
    async fn earlier_assigned_package_wins_overlap() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member(
                "m-1",
                MembershipStatus::Active,
                &[
                    (date(2025, 1, 1), date(2025, 1, 31), 8, 2),
                    (date(2025, 1, 10), date(2025, 2, 28), 20, 20),
                ],
            )
            .await;

        let result = handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap();

        let stored = h.member(&id).await;
        assert_eq!(result.package_id, stored.packages[0].id);
        assert_eq!(stored.packages[0].remaining_lessons, 1);
        assert_eq!(stored.packages[1].remaining_lessons, 20);
    }

    #[tokio::test]
    async fn failures_leave_the_record_untouched() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 0)])
            .await;

        let err = handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap_err();

        assert_eq!(err, LedgerError::NoCreditsInRange { date: date(2025, 1, 15) });
        assert_eq!(h.repo.save_count(), 0);
        assert_eq!(h.bus.event_count().await, 0);
    }

    #[tokio::test]
    async fn frozen_member_cannot_book() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Frozen, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;

        let err = handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap_err();
        assert!(matches!(err, LedgerError::MembershipNotActive { .. }));
    }

    #[tokio::test]
    async fn legacy_member_is_migrated_in_the_same_write() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h.add_member("m-1", MembershipStatus::Active, &[]).await;
        let mut member = h.member(&id).await;
        member.legacy.remaining_classes = Some(5);
        member.legacy.total_classes = Some(10);
        member.legacy.package_start_date = Some(date(2025, 1, 1));
        member.legacy.package_expiry_date = Some(date(2025, 3, 31));
        h.repo.insert(member).await;

        let result = handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap();

        assert_eq!(result.remaining_in_package, 4);
        let stored = h.member(&id).await;
        assert_eq!(stored.packages.len(), 1);
        assert!(stored.packages[0].is_legacy);
        assert_eq!(h.repo.save_count(), 1);
        assert!(h.bus.has_event("legacy.migrated.v1").await);
    }

    #[tokio::test]
    async fn late_store_acknowledgement_deducts_once() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;
        h.repo.set_ack_delay(Duration::from_millis(100));
        let writer = Arc::new(MemberRecordWriter::new(
            h.repository(),
            WritePolicy {
                max_attempts: 3,
                record_timeout: Duration::from_millis(20),
                retry_backoff: Duration::from_millis(1),
            },
        ));
        let handler = DeductCreditHandler::new(writer, h.catalog(), h.clock(), h.publisher());

        let result = handler.handle(command(&id, date(2025, 1, 15))).await.unwrap();

        assert_eq!(result.remaining_in_package, 7);
        let stored = h.member(&id).await;
        assert_eq!(stored.packages[0].remaining_lessons, 7);
        assert_eq!(stored.remaining_classes_aggregate, 7);
        assert_eq!(stored.packages[0].movements.len(), 1);
        assert_eq!(h.bus.events_of_type("credit.deducted.v1").await.len(), 1);
    }

    #[tokio::test]
    async fn lazy_migration_uses_the_legacy_catalog_entry() {
        let h = Harness::on(date(2025, 1, 15));
        h.catalog
            .add(CatalogPackage {
                id: CatalogPackageId::new("duo-10").unwrap(),
                name: "Duo Sessions".to_string(),
                package_type: PackageType::Duo,
                total_lessons: 10,
                duration_months: 3,
                price_cents: 50_000,
            })
            .await;
        let id = h.add_member("m-1", MembershipStatus::Active, &[]).await;
        let mut member = h.member(&id).await;
        member.legacy.remaining_classes = Some(5);
        member.legacy.total_classes = Some(10);
        member.legacy.package_expiry_date = Some(date(2025, 3, 31));
        member.legacy.catalog_package_id = Some(CatalogPackageId::new("duo-10").unwrap());
        h.repo.insert(member).await;

        handler(&h).handle(command(&id, date(2025, 1, 15))).await.unwrap();

        let stored = h.member(&id).await;
        assert_eq!(stored.packages[0].name, "Duo Sessions");
        assert_eq!(stored.packages[0].package_type, PackageType::Duo);
    }

    #[tokio::test]
    async fn concurrent_deductions_are_not_lost() {
        let h = Harness::on(date(2025, 1, 15));
        let id = h
            .add_member("m-1", MembershipStatus::Active, &[(date(2025, 1, 1), date(2025, 1, 31), 8, 8)])
            .await;
        let handler = Arc::new(handler(&h));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let handler = handler.clone();
            let cmd = command(&id, date(2025, 1, 15));
            tasks.push(tokio::spawn(async move { handler.handle(cmd).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = h.member(&id).await;
        assert_eq!(stored.packages[0].remaining_lessons, 4);
        assert_eq!(stored.remaining_classes_aggregate, 4);
    }
}
