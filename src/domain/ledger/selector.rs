//! AllocationSelector - decides which package a booking or refund touches.
//!
//! Ledger insertion order (earliest assigned first) is the tie-break for
//! every choice made here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Package;

/// What to do with a refund whose lesson date no package covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundFallback {
    /// Credit the most recently started package with headroom, else the
    /// last non-cancelled ledger entry.
    #[default]
    MostRecentActive,
    /// Reject the refund with `NoPackageForDate`.
    Disabled,
}

/// Why a deduction could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMiss {
    /// No non-cancelled package covers the date.
    NoPackageForDate,
    /// Packages cover the date but all are depleted.
    NoCreditsInRange,
}

/// Rule that picked a refund target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundBasis {
    /// Package holding an unrefunded deduction for the same lesson date.
    OutstandingDeduction,
    /// First package covering the date.
    CoveringPackage,
    /// Most recently started package with headroom.
    FallbackMostRecent,
    /// Last non-cancelled ledger entry.
    FallbackLastEntry,
}

/// Chosen refund target: index into the ledger plus the rule used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundTarget {
    pub index: usize,
    pub basis: RefundBasis,
}

pub struct AllocationSelector;

impl AllocationSelector {
    /// Non-cancelled packages whose inclusive window contains `date`, in
    /// ledger order.
    pub fn select_for_date(packages: &[Package], date: NaiveDate) -> Vec<&Package> {
        Self::candidate_indices(packages, date)
            .map(|i| &packages[i])
            .collect()
    }

    fn candidate_indices(packages: &[Package], date: NaiveDate) -> impl Iterator<Item = usize> + '_ {
        packages
            .iter()
            .enumerate()
            .filter(move |(_, p)| !p.is_cancelled() && p.covers(date))
            .map(|(i, _)| i)
    }

    /// Index of the package a booking on `date` draws from.
    pub fn deduction_target(packages: &[Package], date: NaiveDate) -> Result<usize, SelectionMiss> {
        let mut any_candidate = false;
        for i in Self::candidate_indices(packages, date) {
            any_candidate = true;
            if packages[i].remaining_lessons > 0 {
                return Ok(i);
            }
        }
        if any_candidate {
            Err(SelectionMiss::NoCreditsInRange)
        } else {
            Err(SelectionMiss::NoPackageForDate)
        }
    }

    /// Package a cancellation on `date` gives its credit back to.
    ///
    /// Precedence:
    /// 1. the package with an outstanding deduction journaled under `note`
    /// 2. the package with any outstanding deduction for `date` (latest first)
    /// 3. the first covering package with headroom
    /// 4. the first covering package (refund will be capped)
    /// 5. the configured fallback when nothing covers `date`
    pub fn refund_target(
        packages: &[Package],
        date: NaiveDate,
        note: &str,
        fallback: RefundFallback,
    ) -> Option<RefundTarget> {
        let refundable = || {
            packages
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_cancelled() && p.has_headroom())
        };
        let outstanding = refundable()
            .filter(|(_, p)| p.outstanding_deductions_noted(date, note) > 0)
            .max_by_key(|(_, p)| p.last_deduction_at(date))
            .or_else(|| {
                refundable()
                    .filter(|(_, p)| p.outstanding_deductions(date) > 0)
                    .max_by_key(|(_, p)| p.last_deduction_at(date))
            });
        if let Some((index, _)) = outstanding {
            return Some(RefundTarget {
                index,
                basis: RefundBasis::OutstandingDeduction,
            });
        }

        let covering: Vec<usize> = Self::candidate_indices(packages, date).collect();
        if let Some(&index) = covering
            .iter()
            .find(|&&i| packages[i].has_headroom())
            .or_else(|| covering.first())
        {
            return Some(RefundTarget {
                index,
                basis: RefundBasis::CoveringPackage,
            });
        }

        match fallback {
            RefundFallback::Disabled => None,
            RefundFallback::MostRecentActive => Self::fallback_target(packages),
        }
    }

    fn fallback_target(packages: &[Package]) -> Option<RefundTarget> {
        let most_recent = packages
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_cancelled() && p.has_headroom())
            .max_by_key(|(_, p)| p.start_date);
        if let Some((index, _)) = most_recent {
            return Some(RefundTarget {
                index,
                basis: RefundBasis::FallbackMostRecent,
            });
        }

        packages
            .iter()
            .rposition(|p| !p.is_cancelled())
            .map(|index| RefundTarget {
                index,
                basis: RefundBasis::FallbackLastEntry,
            })
    }
}
