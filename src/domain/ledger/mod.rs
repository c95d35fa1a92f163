//! Lesson-credit ledger domain.
//!
//! # Module Structure
//!
//! - `package` - Package allocation entity and credit journal
//! - `package_ledger` - Status derivation and aggregate rules
//! - `selector` - Allocation selection for deductions and refunds
//! - `expiry` - Freeze window day arithmetic
//! - `terms` - Resolver chains for new package terms
//! - `migration` - Pre-ledger record conversion

mod expiry;
mod migration;
mod package;
mod package_ledger;
mod selector;
pub mod terms;

pub use expiry::ExpiryClock;
pub use migration::{LegacyCredits, LegacyMigrator, MigrationOutcome, MIGRATION_ACTOR};
pub use package::{
    expiry_from_duration, CreditMovement, MovementKind, Package, PackageCancellation, PackageStatus,
    PackageType, ResolvedTerms, DAYS_PER_MONTH,
};
pub use package_ledger::PackageLedger;
pub use selector::{AllocationSelector, RefundBasis, RefundFallback, RefundTarget, SelectionMiss};
pub use terms::{CatalogPackage, ManualTerms, PackageTerms};

#[cfg(test)]
pub(crate) use package::test_support;
