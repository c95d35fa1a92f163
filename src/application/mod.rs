//! Application layer - handlers that orchestrate ledger operations.
//!
//! Handlers load a member through `MemberRecordWriter`, run the domain
//! operation on it, commit, then publish events. `LedgerService` bundles
//! them behind one facade.

pub mod batch;
pub mod handlers;
mod legacy;
mod ledger_service;
mod publishing;
pub mod record_writer;
mod settings;

#[cfg(test)]
pub(crate) mod test_fixture;

pub use batch::{BatchOutcome, MemberFailure};
pub use handlers::{
    AutoReconciler, BatchResult, BookingEvent, BookingOutcome, LessonBooking, MemberOverview,
    MigrationSummary, PackageView, ReconcileReport, ReconcilerJob,
};
pub use ledger_service::LedgerService;
pub use record_writer::{Committed, MemberRecordWriter, WritePolicy};
pub use settings::{LedgerSettings, DEFAULT_SYSTEM_ACTOR};
