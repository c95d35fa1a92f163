//! Application handlers.
//!
//! One handler per ledger operation. Every mutating handler goes through
//! `MemberRecordWriter` and publishes events only after the write commits.

pub mod booking;
pub mod credit;
pub mod freeze;
pub mod migration;
pub mod reconcile;

pub use booking::{BookingEvent, BookingEventHandler, BookingOutcome, LessonBooking};
pub use credit::{
    AddPackageCommand, AddPackageHandler, CancelPackageCommand, CancelPackageHandler,
    CheckEligibilityCommand, CheckEligibilityHandler, DeductCreditCommand, DeductCreditHandler,
    RefundCreditCommand, RefundCreditHandler,
};
pub use freeze::{
    BatchResult, BulkFreezeCoordinator, FreezeAllCommand, FreezeMemberCommand, FreezeMemberHandler,
    UnfreezeAllCommand, UnfreezeMemberCommand, UnfreezeMemberHandler,
};
pub use migration::{MigrateAllHandler, MigrateMemberCommand, MigrateMemberHandler, MigrationSummary};
pub use reconcile::{
    AutoReconciler, ListMembersHandler, MemberOverview, PackageView, ReconcileReport, ReconcilerJob,
};
