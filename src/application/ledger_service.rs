//! LedgerService - the credit ledger's public contract.
//!
//! Wires every handler from one set of ports so collaborators (booking
//! flow, admin tools, the background job) hold a single value instead of
//! a dozen handlers.

use chrono::NaiveDate;
use std::sync::Arc;

use super::handlers::{
    AddPackageCommand, AddPackageHandler, AutoReconciler, BatchResult, BookingEvent,
    BookingEventHandler, BookingOutcome, BulkFreezeCoordinator, CancelPackageCommand,
    CancelPackageHandler, CheckEligibilityCommand, CheckEligibilityHandler, DeductCreditCommand,
    DeductCreditHandler, FreezeAllCommand, FreezeMemberCommand, FreezeMemberHandler,
    ListMembersHandler, MemberOverview, MigrateAllHandler, MigrateMemberCommand,
    MigrateMemberHandler, MigrationSummary, ReconcileReport, RefundCreditCommand,
    RefundCreditHandler, UnfreezeAllCommand, UnfreezeMemberCommand, UnfreezeMemberHandler,
};
use super::{LedgerSettings, MemberRecordWriter};
use crate::domain::foundation::{MemberId, PackageId};
use crate::domain::ledger::{MigrationOutcome, Package, PackageTerms};
use crate::domain::membership::{
    DeductionResult, Eligibility, FreezeRecord, FreezeScope, LedgerError, RefundResult,
    UnfreezeResult,
};
use crate::ports::{Clock, EventPublisher, MemberRepository, PackageCatalog};

/// Actor recorded when callers do not name one.
const DEFAULT_CREDIT_ACTOR: &str = "booking";

pub struct LedgerService {
    check_eligibility: CheckEligibilityHandler,
    deduct: Arc<DeductCreditHandler>,
    refund: Arc<RefundCreditHandler>,
    add_package: AddPackageHandler,
    cancel_package: CancelPackageHandler,
    freeze: FreezeMemberHandler,
    unfreeze: UnfreezeMemberHandler,
    bulk: BulkFreezeCoordinator,
    migrate_member: Arc<MigrateMemberHandler>,
    migrate_all: MigrateAllHandler,
    reconciler: Arc<AutoReconciler>,
    list_members: ListMembersHandler,
    bookings: BookingEventHandler,
}

impl LedgerService {
    pub fn new(
        repository: Arc<dyn MemberRepository>,
        catalog: Arc<dyn PackageCatalog>,
        event_publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        settings: LedgerSettings,
    ) -> Self {
        let writer = Arc::new(MemberRecordWriter::new(repository, settings.write_policy));

        let deduct = Arc::new(DeductCreditHandler::new(
            writer.clone(),
            catalog.clone(),
            clock.clone(),
            event_publisher.clone(),
        ));
        let refund = Arc::new(RefundCreditHandler::new(
            writer.clone(),
            catalog.clone(),
            clock.clone(),
            event_publisher.clone(),
            settings.refund_fallback,
        ));
        let migrate_member = Arc::new(MigrateMemberHandler::new(
            writer.clone(),
            catalog.clone(),
            clock.clone(),
            event_publisher.clone(),
        ));
        let reconciler = Arc::new(AutoReconciler::new(
            writer.clone(),
            clock.clone(),
            event_publisher.clone(),
            settings.system_actor,
        ));

        Self {
            check_eligibility: CheckEligibilityHandler::new(writer.clone(), catalog.clone(), clock.clone()),
            add_package: AddPackageHandler::new(
                writer.clone(),
                catalog,
                clock.clone(),
                event_publisher.clone(),
            ),
            cancel_package: CancelPackageHandler::new(
                writer.clone(),
                clock.clone(),
                event_publisher.clone(),
            ),
            freeze: FreezeMemberHandler::new(writer.clone(), clock.clone(), event_publisher.clone()),
            unfreeze: UnfreezeMemberHandler::new(
                writer.clone(),
                clock.clone(),
                event_publisher.clone(),
            ),
            bulk: BulkFreezeCoordinator::new(writer.clone(), clock.clone(), event_publisher),
            migrate_all: MigrateAllHandler::new(writer.clone(), migrate_member.clone()),
            list_members: ListMembersHandler::new(writer, reconciler.clone(), clock),
            bookings: BookingEventHandler::new(deduct.clone(), refund.clone()),
            deduct,
            refund,
            migrate_member,
            reconciler,
        }
    }

    /// Shared reconciler, for the periodic job.
    pub fn reconciler(&self) -> Arc<AutoReconciler> {
        self.reconciler.clone()
    }

    pub async fn can_book(&self, member_id: &MemberId, date: NaiveDate) -> Result<Eligibility, LedgerError> {
        self.check_eligibility
            .handle(CheckEligibilityCommand {
                member_id: member_id.clone(),
                lesson_date: date,
            })
            .await
    }

    pub async fn deduct(
        &self,
        member_id: &MemberId,
        date: NaiveDate,
        note: &str,
    ) -> Result<DeductionResult, LedgerError> {
        self.deduct
            .handle(DeductCreditCommand {
                member_id: member_id.clone(),
                lesson_date: date,
                note: note.to_string(),
                actor: DEFAULT_CREDIT_ACTOR.to_string(),
            })
            .await
    }

    pub async fn refund(
        &self,
        member_id: &MemberId,
        date: NaiveDate,
        note: &str,
    ) -> Result<RefundResult, LedgerError> {
        self.refund
            .handle(RefundCreditCommand {
                member_id: member_id.clone(),
                lesson_date: date,
                note: note.to_string(),
                actor: DEFAULT_CREDIT_ACTOR.to_string(),
            })
            .await
    }

    /// Assigns a package starting today.
    pub async fn add_package(
        &self,
        member_id: &MemberId,
        terms: PackageTerms,
        actor: &str,
    ) -> Result<Package, LedgerError> {
        self.add_package_from(member_id, terms, None, actor).await
    }

    /// Assigns a package starting on `start_date` (today if `None`).
    pub async fn add_package_from(
        &self,
        member_id: &MemberId,
        terms: PackageTerms,
        start_date: Option<NaiveDate>,
        actor: &str,
    ) -> Result<Package, LedgerError> {
        self.add_package
            .handle(AddPackageCommand {
                member_id: member_id.clone(),
                terms,
                start_date,
                actor: actor.to_string(),
            })
            .await
    }

    pub async fn cancel_package(
        &self,
        member_id: &MemberId,
        package_id: PackageId,
        actor: &str,
        reason: Option<String>,
    ) -> Result<Package, LedgerError> {
        self.cancel_package
            .handle(CancelPackageCommand {
                member_id: member_id.clone(),
                package_id,
                actor: actor.to_string(),
                reason,
            })
            .await
    }

    /// Individually freezes one member.
    pub async fn freeze(
        &self,
        member_id: &MemberId,
        reason: &str,
        end_date: NaiveDate,
        actor: &str,
    ) -> Result<FreezeRecord, LedgerError> {
        self.freeze
            .handle(FreezeMemberCommand {
                member_id: member_id.clone(),
                reason: reason.to_string(),
                planned_end: end_date,
                actor: actor.to_string(),
                scope: FreezeScope::Individual,
            })
            .await
    }

    pub async fn unfreeze(
        &self,
        member_id: &MemberId,
        actor: &str,
        reason: Option<String>,
    ) -> Result<UnfreezeResult, LedgerError> {
        self.unfreeze
            .handle(UnfreezeMemberCommand {
                member_id: member_id.clone(),
                actor: actor.to_string(),
                reason,
            })
            .await
    }

    pub async fn freeze_all(
        &self,
        reason: &str,
        end_date: NaiveDate,
        actor: &str,
    ) -> Result<BatchResult, LedgerError> {
        self.bulk
            .freeze_all(FreezeAllCommand {
                reason: reason.to_string(),
                planned_end: end_date,
                actor: actor.to_string(),
            })
            .await
    }

    pub async fn unfreeze_all(&self, actor: &str, reason: Option<String>) -> Result<BatchResult, LedgerError> {
        self.bulk
            .unfreeze_all(UnfreezeAllCommand {
                actor: actor.to_string(),
                reason,
            })
            .await
    }

    pub async fn migrate_member(&self, member_id: &MemberId) -> Result<MigrationOutcome, LedgerError> {
        self.migrate_member
            .handle(MigrateMemberCommand {
                member_id: member_id.clone(),
            })
            .await
    }

    pub async fn migrate_all(&self) -> Result<MigrationSummary, LedgerError> {
        self.migrate_all.handle().await
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, LedgerError> {
        self.reconciler.run().await
    }

    pub async fn list_members(&self) -> Result<Vec<MemberOverview>, LedgerError> {
        self.list_members.handle().await
    }

    pub async fn handle_booking_event(&self, event: BookingEvent) -> Result<BookingOutcome, LedgerError> {
        self.bookings.handle(event).await
    }
}
