//! PackageLedger - status and aggregate rules shared by every component.
//!
//! Pure functions over a package list; no I/O.

use chrono::NaiveDate;

use super::{Package, PackageStatus};

/// Status and aggregate derivation for a member's package list.
pub struct PackageLedger;

impl PackageLedger {
    /// Derives the status of `package` as seen on `today`.
    ///
    /// Cancellation wins over everything; otherwise the date window is
    /// checked before the credit balance.
    pub fn derive_status(package: &Package, today: NaiveDate) -> PackageStatus {
        if package.is_cancelled() {
            PackageStatus::Cancelled
        } else if today < package.start_date {
            PackageStatus::Upcoming
        } else if today > package.expiry_date {
            PackageStatus::Expired
        } else if package.remaining_lessons == 0 {
            PackageStatus::Depleted
        } else {
            PackageStatus::Active
        }
    }

    /// Sum of remaining lessons over non-cancelled packages.
    pub fn recompute_aggregate(packages: &[Package]) -> u32 {
        packages
            .iter()
            .filter(|p| !p.is_cancelled())
            .map(|p| p.remaining_lessons)
            .sum()
    }

    /// True if the cached aggregate matches the package list.
    pub fn is_consistent(packages: &[Package], aggregate: u32) -> bool {
        Self::recompute_aggregate(packages) == aggregate
    }

    /// Pairs each package with its derived status, in ledger order.
    pub fn statuses(packages: &[Package], today: NaiveDate) -> Vec<(&Package, PackageStatus)> {
        packages
            .iter()
            .map(|p| (p, Self::derive_status(p, today)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::package::test_support::{date, package};
    use super::super::PackageCancellation;
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn cancelled(mut p: Package) -> Package {
        p.cancel(PackageCancellation {
            cancelled_at: Timestamp::now(),
            cancelled_by: "admin".to_string(),
            reason: None,
        });
        p
    }

    #[test]
    fn active_when_in_range_with_credits() {
        let p = package(date(2025, 1, 1), date(2025, 1, 31), 8, 3);
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 1, 15)),
            PackageStatus::Active
        );
    }

    #[test]
    fn upcoming_before_start() {
        let p = package(date(2025, 2, 1), date(2025, 2, 28), 8, 8);
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 1, 15)),
            PackageStatus::Upcoming
        );
    }

    #[test]
    fn expired_after_expiry_day_only() {
        let p = package(date(2025, 1, 1), date(2025, 1, 31), 8, 8);
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 1, 31)),
            PackageStatus::Active
        );
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 2, 1)),
            PackageStatus::Expired
        );
    }

    #[test]
    fn depleted_in_range_with_zero_remaining() {
        let p = package(date(2025, 1, 1), date(2025, 1, 31), 8, 0);
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 1, 15)),
            PackageStatus::Depleted
        );
    }

    #[test]
    fn cancelled_overrides_window() {
        let p = cancelled(package(date(2025, 1, 1), date(2025, 1, 31), 8, 8));
        assert_eq!(
            PackageLedger::derive_status(&p, date(2025, 1, 15)),
            PackageStatus::Cancelled
        );
    }

    #[test]
    fn aggregate_skips_cancelled_but_keeps_expired() {
        let packages = vec![
            package(date(2024, 1, 1), date(2024, 1, 31), 8, 2),
            package(date(2025, 1, 1), date(2025, 1, 31), 8, 5),
            cancelled(package(date(2025, 1, 1), date(2025, 1, 31), 8, 8)),
        ];
        assert_eq!(PackageLedger::recompute_aggregate(&packages), 7);
        assert!(PackageLedger::is_consistent(&packages, 7));
        assert!(!PackageLedger::is_consistent(&packages, 15));
    }

    #[test]
    fn empty_ledger_aggregates_to_zero() {
        assert_eq!(PackageLedger::recompute_aggregate(&[]), 0);
    }
}
