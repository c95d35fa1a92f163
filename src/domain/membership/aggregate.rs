//! Member aggregate.
//!
//! The member record is owned by the surrounding system; the ledger owns the
//! sub-tree made of `packages`, the cached aggregate, the freeze record and
//! the membership status transitions driven by freeze/unfreeze.
//!
//! # Invariants
//!
//! - `remaining_classes_aggregate` equals the sum of `remaining_lessons`
//!   over non-cancelled packages after every mutating method returns
//! - `freeze.is_some()` exactly when `membership_status == Frozen`
//! - While frozen no expiry date moves; unfreeze recomputes each one once
//!   from the snapshot taken at freeze time

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    FreezeHistoryEntry, FreezeRecord, FreezeRequest, FreezeSnapshot, LedgerError, MembershipStatus,
    PackageExpiry,
};
use crate::domain::foundation::{MemberId, PackageId, StateMachine, Timestamp};
use crate::domain::ledger::{
    AllocationSelector, ExpiryClock, LegacyCredits, Package, PackageCancellation, PackageLedger,
    PackageStatus, RefundBasis, RefundFallback, ResolvedTerms, SelectionMiss,
};

/// A studio member as seen by the credit ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,

    #[serde(default)]
    pub display_name: String,

    pub membership_status: MembershipStatus,

    /// Allocations in assignment order.
    #[serde(default)]
    pub packages: Vec<Package>,

    /// Cached sum of remaining lessons. Derivable, never authoritative.
    #[serde(default)]
    pub remaining_classes_aggregate: u32,

    /// Present only while frozen.
    #[serde(default)]
    pub freeze: Option<FreezeRecord>,

    #[serde(default)]
    pub freeze_history: Vec<FreezeHistoryEntry>,

    /// Pre-ledger credit fields.
    #[serde(default)]
    pub legacy: LegacyCredits,

    /// Soft-deleted records are skipped by every batch.
    #[serde(default)]
    pub deleted: bool,

    pub created_at: Timestamp,

    pub updated_at: Timestamp,
}

/// Why a booking would be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    NoPackageForDate,
    NoCreditsInRange,
    MembershipNotActive,
}

/// Answer to "can this member book on that date?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub can_book: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligibility>,
    /// Package a booking would draw from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<PackageId>,
}

impl Eligibility {
    fn eligible(package_id: PackageId) -> Self {
        Self {
            can_book: true,
            reason: None,
            package_id: Some(package_id),
        }
    }

    fn refused(reason: Ineligibility) -> Self {
        Self {
            can_book: false,
            reason: Some(reason),
            package_id: None,
        }
    }
}

/// Outcome of a deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionResult {
    pub package_id: PackageId,
    pub package_name: String,
    pub lesson_date: NaiveDate,
    pub remaining_in_package: u32,
    pub aggregate: u32,
}

/// Outcome of a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResult {
    pub package_id: PackageId,
    pub package_name: String,
    pub lesson_date: NaiveDate,
    pub remaining_in_package: u32,
    pub aggregate: u32,
    pub basis: RefundBasis,
    /// The target was already full, so nothing changed.
    pub capped: bool,
}

/// Outcome of an unfreeze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfreezeResult {
    pub restored_status: MembershipStatus,
    pub actual_frozen_days: i64,
    /// New expiry of every package that was extended.
    pub extended: Vec<PackageExpiry>,
}

impl Member {
    pub fn new(
        id: MemberId,
        display_name: impl Into<String>,
        membership_status: MembershipStatus,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            membership_status,
            packages: Vec::new(),
            remaining_classes_aggregate: 0,
            freeze: None,
            freeze_history: Vec::new(),
            legacy: LegacyCredits::default(),
            deleted: false,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.membership_status == MembershipStatus::Frozen
    }

    pub fn package(&self, id: &PackageId) -> Option<&Package> {
        self.packages.iter().find(|p| &p.id == id)
    }

    pub fn package_statuses(&self, today: NaiveDate) -> Vec<(&Package, PackageStatus)> {
        PackageLedger::statuses(&self.packages, today)
    }

    /// Recomputes the cached aggregate. Returns the stale value if it drifted.
    pub fn recompute_aggregate(&mut self) -> Option<u32> {
        let fresh = PackageLedger::recompute_aggregate(&self.packages);
        if fresh == self.remaining_classes_aggregate {
            return None;
        }
        let stale = self.remaining_classes_aggregate;
        self.remaining_classes_aggregate = fresh;
        Some(stale)
    }

    /// True if the member is frozen and the planned window has passed.
    pub fn freeze_lapsed(&self, today: NaiveDate) -> bool {
        self.is_frozen() && self.freeze.as_ref().is_some_and(|f| f.has_lapsed(today))
    }

    pub fn eligibility(&self, date: NaiveDate) -> Eligibility {
        if !self.membership_status.can_book() {
            return Eligibility::refused(Ineligibility::MembershipNotActive);
        }
        match AllocationSelector::deduction_target(&self.packages, date) {
            Ok(index) => Eligibility::eligible(self.packages[index].id),
            Err(SelectionMiss::NoPackageForDate) => {
                Eligibility::refused(Ineligibility::NoPackageForDate)
            }
            Err(SelectionMiss::NoCreditsInRange) => {
                Eligibility::refused(Ineligibility::NoCreditsInRange)
            }
        }
    }

    /// Consumes one lesson from the earliest-assigned covering package.
    pub fn deduct_credit(
        &mut self,
        date: NaiveDate,
        note: &str,
        now: Timestamp,
    ) -> Result<DeductionResult, LedgerError> {
        if !self.membership_status.can_book() {
            return Err(LedgerError::MembershipNotActive {
                status: self.membership_status,
            });
        }
        let index = AllocationSelector::deduction_target(&self.packages, date)
            .map_err(|miss| selection_error(miss, date))?;

        let package = &mut self.packages[index];
        if !package.take_credit(date, note, now) {
            return Err(LedgerError::NoCreditsInRange { date });
        }
        let (package_id, package_name, remaining) =
            (package.id, package.name.clone(), package.remaining_lessons);

        self.recompute_aggregate();
        self.updated_at = now;

        Ok(DeductionResult {
            package_id,
            package_name,
            lesson_date: date,
            remaining_in_package: remaining,
            aggregate: self.remaining_classes_aggregate,
        })
    }

    /// Gives one lesson back for a cancelled booking on `date`.
    ///
    /// Allowed in any membership status. A refund into a full package is
    /// reported as `capped` and changes nothing.
    pub fn refund_credit(
        &mut self,
        date: NaiveDate,
        note: &str,
        fallback: RefundFallback,
        now: Timestamp,
    ) -> Result<RefundResult, LedgerError> {
        let target = AllocationSelector::refund_target(&self.packages, date, note, fallback)
            .ok_or(LedgerError::NoPackageForDate { date })?;

        let package = &mut self.packages[target.index];
        let applied = package.restore_credit(date, note, now);
        let (package_id, package_name, remaining) =
            (package.id, package.name.clone(), package.remaining_lessons);

        self.recompute_aggregate();
        if applied {
            self.updated_at = now;
        }

        Ok(RefundResult {
            package_id,
            package_name,
            lesson_date: date,
            remaining_in_package: remaining,
            aggregate: self.remaining_classes_aggregate,
            basis: target.basis,
            capped: !applied,
        })
    }

    /// Appends a freshly assigned package.
    pub fn assign_package(
        &mut self,
        terms: ResolvedTerms,
        start_date: NaiveDate,
        actor: &str,
        now: Timestamp,
    ) -> Result<Package, LedgerError> {
        if !self.membership_status.accepts_packages() {
            return Err(LedgerError::invalid_state(
                self.membership_status.as_str(),
                "assign a package",
            ));
        }
        require_actor(actor)?;

        let package = Package::assign(terms, start_date, actor, now)?;
        self.packages.push(package.clone());
        self.recompute_aggregate();
        self.updated_at = now;
        Ok(package)
    }

    /// Voids one package. Cancellation is terminal.
    pub fn cancel_package(
        &mut self,
        package_id: &PackageId,
        actor: &str,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<Package, LedgerError> {
        require_actor(actor)?;
        let package = self
            .packages
            .iter_mut()
            .find(|p| &p.id == package_id)
            .ok_or_else(|| LedgerError::package_not_found(package_id))?;
        if package.is_cancelled() {
            return Err(LedgerError::invalid_state("cancelled", "cancel the package"));
        }

        package.cancel(PackageCancellation {
            cancelled_at: now,
            cancelled_by: actor.to_string(),
            reason: reason.filter(|r| !r.trim().is_empty()),
        });
        let cancelled = package.clone();

        self.recompute_aggregate();
        self.updated_at = now;
        Ok(cancelled)
    }

    /// Stops every current package's expiry clock.
    pub fn freeze(
        &mut self,
        request: FreezeRequest,
        today: NaiveDate,
        now: Timestamp,
    ) -> Result<&FreezeRecord, LedgerError> {
        if self.is_frozen() || self.freeze.is_some() {
            return Err(LedgerError::AlreadyFrozen {
                member_id: self.id.to_string(),
            });
        }
        let next_status = self
            .membership_status
            .transition_to(MembershipStatus::Frozen)
            .map_err(|_| LedgerError::invalid_state(self.membership_status.as_str(), "freeze"))?;

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation("reason", "Freeze reason is required"));
        }
        require_actor(&request.actor)?;
        if !ExpiryClock::is_valid_window(today, request.planned_end) {
            return Err(LedgerError::InvalidFreezeWindow {
                today,
                planned_end: request.planned_end,
            });
        }

        let package_expiries = self
            .packages
            .iter()
            .filter(|p| !p.is_cancelled() && p.expiry_date >= today)
            .map(|p| PackageExpiry {
                package_id: p.id,
                expiry_date: p.expiry_date,
            })
            .collect();

        let record = FreezeRecord {
            freeze_start_date: today,
            freeze_end_date_planned: request.planned_end,
            planned_duration_days: ExpiryClock::planned_duration_days(today, request.planned_end),
            reason: reason.to_string(),
            frozen_by: request.actor,
            freeze_scope: request.scope,
            frozen_at: now,
            snapshot: FreezeSnapshot {
                membership_status: self.membership_status,
                package_expiries,
            },
        };

        self.membership_status = next_status;
        self.updated_at = now;
        Ok(self.freeze.insert(record))
    }

    /// Restarts expiry clocks, extending each snapshotted package by the
    /// days actually spent frozen.
    pub fn unfreeze(
        &mut self,
        actor: &str,
        reason: Option<String>,
        today: NaiveDate,
        now: Timestamp,
    ) -> Result<UnfreezeResult, LedgerError> {
        require_actor(actor)?;
        let record = match (&self.freeze, self.is_frozen()) {
            (Some(record), true) => record,
            _ => {
                return Err(LedgerError::NotFrozen {
                    member_id: self.id.to_string(),
                })
            }
        };
        let restored_status = record.snapshot.membership_status;
        if !self.membership_status.can_transition_to(&restored_status) {
            return Err(LedgerError::invalid_state(
                self.membership_status.as_str(),
                format!("restore {}", restored_status),
            ));
        }

        let actual_frozen_days = ExpiryClock::actual_frozen_days(
            record.freeze_start_date,
            record.freeze_end_date_planned,
            record.planned_duration_days,
            today,
        );

        let mut extended = Vec::new();
        for package in self.packages.iter().filter(|p| !p.is_cancelled()) {
            if let Some(original) = record.snapshot.original_expiry(&package.id) {
                extended.push(PackageExpiry {
                    package_id: package.id,
                    expiry_date: ExpiryClock::extended_expiry(original, actual_frozen_days)?,
                });
            }
        }
        for expiry in &extended {
            if let Some(package) = self.packages.iter_mut().find(|p| p.id == expiry.package_id) {
                package.expiry_date = expiry.expiry_date;
            }
        }

        let entry = FreezeHistoryEntry::close(
            record,
            today,
            actual_frozen_days,
            actor,
            reason.filter(|r| !r.trim().is_empty()),
        );
        self.freeze_history.push(entry);
        self.freeze = None;
        self.membership_status = restored_status;
        self.updated_at = now;

        Ok(UnfreezeResult {
            restored_status,
            actual_frozen_days,
            extended,
        })
    }
}

fn selection_error(miss: SelectionMiss, date: NaiveDate) -> LedgerError {
    match miss {
        SelectionMiss::NoPackageForDate => LedgerError::NoPackageForDate { date },
        SelectionMiss::NoCreditsInRange => LedgerError::NoCreditsInRange { date },
    }
}

fn require_actor(actor: &str) -> Result<(), LedgerError> {
    if actor.trim().is_empty() {
        return Err(LedgerError::validation("actor", "Actor is required"));
    }
    Ok(())
}
