//! Package - one time-bounded credit allocation in a member's ledger.
//!
//! # Invariants
//!
//! - `0 <= remaining_lessons <= total_lessons`
//! - `start_date <= expiry_date`, both inclusive
//! - A cancelled package is never reactivated
//! - `remaining_lessons` only changes through `take_credit`/`restore_credit`
//!   (deduct/refund) or at construction (assignment)

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{CatalogPackageId, PackageId, Timestamp, ValidationError};

/// Fixed month length used for package durations.
///
/// Durations are expressed in months but converted with a flat 30 days so
/// every store and client computes the same expiry.
pub const DAYS_PER_MONTH: i64 = 30;

/// Kind of lesson a package pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    Group,
    OneOnOne,
    Duo,
}

impl PackageType {
    /// Parses the stored spelling, accepting the older underscore variants.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "group" => Some(PackageType::Group),
            "one-on-one" | "private" => Some(PackageType::OneOnOne),
            "duo" => Some(PackageType::Duo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Group => "group",
            PackageType::OneOnOne => "one-on-one",
            PackageType::Duo => "duo",
        }
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived lifecycle status of a package. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    /// Today within range and credits left.
    Active,
    /// Starts in the future.
    Upcoming,
    /// Expiry date has passed.
    Expired,
    /// In range but no credits left.
    Depleted,
    /// Explicitly voided. Terminal.
    Cancelled,
}

/// Direction of a credit movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Deduction,
    Refund,
}

/// One journal line recorded against a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditMovement {
    pub kind: MovementKind,
    /// Date of the lesson the movement belongs to.
    pub lesson_date: NaiveDate,
    pub note: String,
    pub recorded_at: Timestamp,
}

/// Audit record of an explicit cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCancellation {
    pub cancelled_at: Timestamp,
    pub cancelled_by: String,
    pub reason: Option<String>,
}

/// Fully resolved terms for a new allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerms {
    pub catalog_package_id: Option<CatalogPackageId>,
    pub name: String,
    pub package_type: PackageType,
    pub total_lessons: u32,
    pub duration_months: u32,
}

/// One allocation in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,

    #[serde(default)]
    pub catalog_package_id: Option<CatalogPackageId>,

    pub name: String,

    #[serde(rename = "type")]
    pub package_type: PackageType,

    /// First valid day (inclusive).
    pub start_date: NaiveDate,

    /// Last valid day (inclusive).
    pub expiry_date: NaiveDate,

    pub total_lessons: u32,

    pub remaining_lessons: u32,

    pub assigned_at: Timestamp,

    pub assigned_by: String,

    /// Synthesized from pre-ledger member fields.
    #[serde(default)]
    pub is_legacy: bool,

    #[serde(default)]
    pub cancellation: Option<PackageCancellation>,

    #[serde(default)]
    pub movements: Vec<CreditMovement>,
}

impl Package {
    /// Creates a freshly assigned package with all lessons available.
    ///
    /// `expiry_date = start_date + duration_months * 30 days`.
    pub fn assign(
        terms: ResolvedTerms,
        start_date: NaiveDate,
        assigned_by: impl Into<String>,
        assigned_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let expiry_date = expiry_from_duration(start_date, terms.duration_months)?;
        Ok(Self {
            id: PackageId::new(),
            catalog_package_id: terms.catalog_package_id,
            name: terms.name,
            package_type: terms.package_type,
            start_date,
            expiry_date,
            total_lessons: terms.total_lessons,
            remaining_lessons: terms.total_lessons,
            assigned_at,
            assigned_by: assigned_by.into(),
            is_legacy: false,
            cancellation: None,
            movements: Vec::new(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_some()
    }

    /// True if `date` lies within `[start_date, expiry_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.expiry_date
    }

    /// True if a refund would not exceed `total_lessons`.
    pub fn has_headroom(&self) -> bool {
        self.remaining_lessons < self.total_lessons
    }

    /// Number of deductions for `lesson_date` not yet matched by a refund.
    pub fn outstanding_deductions(&self, lesson_date: NaiveDate) -> usize {
        let (deducted, refunded) = self
            .movements
            .iter()
            .filter(|m| m.lesson_date == lesson_date)
            .fold((0usize, 0usize), |(d, r), m| match m.kind {
                MovementKind::Deduction => (d + 1, r),
                MovementKind::Refund => (d, r + 1),
            });
        deducted.saturating_sub(refunded)
    }

    /// Deductions for `lesson_date` journaled under `note` and not yet
    /// matched by a refund with the same note.
    pub fn outstanding_deductions_noted(&self, lesson_date: NaiveDate, note: &str) -> usize {
        let (deducted, refunded) = self
            .movements
            .iter()
            .filter(|m| m.lesson_date == lesson_date && m.note == note)
            .fold((0usize, 0usize), |(d, r), m| match m.kind {
                MovementKind::Deduction => (d + 1, r),
                MovementKind::Refund => (d, r + 1),
            });
        deducted.saturating_sub(refunded)
    }

    /// When the latest deduction for `lesson_date` was recorded.
    pub fn last_deduction_at(&self, lesson_date: NaiveDate) -> Option<Timestamp> {
        self.movements
            .iter()
            .filter(|m| m.kind == MovementKind::Deduction && m.lesson_date == lesson_date)
            .map(|m| m.recorded_at)
            .max()
    }

    /// Consumes one lesson. Returns false if nothing was left.
    pub(crate) fn take_credit(
        &mut self,
        lesson_date: NaiveDate,
        note: &str,
        recorded_at: Timestamp,
    ) -> bool {
        if self.remaining_lessons == 0 {
            return false;
        }
        self.remaining_lessons -= 1;
        self.movements.push(CreditMovement {
            kind: MovementKind::Deduction,
            lesson_date,
            note: note.to_string(),
            recorded_at,
        });
        true
    }

    /// Gives one lesson back, capped at `total_lessons`.
    ///
    /// Returns false (and records nothing) when the cap was hit.
    pub(crate) fn restore_credit(
        &mut self,
        lesson_date: NaiveDate,
        note: &str,
        recorded_at: Timestamp,
    ) -> bool {
        if !self.has_headroom() {
            return false;
        }
        self.remaining_lessons += 1;
        self.movements.push(CreditMovement {
            kind: MovementKind::Refund,
            lesson_date,
            note: note.to_string(),
            recorded_at,
        });
        true
    }

    pub(crate) fn cancel(&mut self, cancellation: PackageCancellation) {
        if self.cancellation.is_none() {
            self.cancellation = Some(cancellation);
        }
    }
}

/// Expiry for a package starting on `start` and lasting `months` flat months.
///
/// Fails when the expiry would fall past the last representable date.
pub fn expiry_from_duration(start: NaiveDate, months: u32) -> Result<NaiveDate, ValidationError> {
    let days = u64::from(months) * DAYS_PER_MONTH.unsigned_abs();
    start.checked_add_days(Days::new(days)).ok_or_else(|| {
        ValidationError::invalid_format(
            "duration_months",
            format!("{months} months from {start} is past the supported calendar"),
        )
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Package with an explicit window, bypassing duration arithmetic.
    pub fn package(start: NaiveDate, expiry: NaiveDate, total: u32, remaining: u32) -> Package {
        Package {
            id: PackageId::new(),
            catalog_package_id: None,
            name: "Test Package".to_string(),
            package_type: PackageType::Group,
            start_date: start,
            expiry_date: expiry,
            total_lessons: total,
            remaining_lessons: remaining,
            assigned_at: Timestamp::start_of_day(start),
            assigned_by: "test".to_string(),
            is_legacy: false,
            cancellation: None,
            movements: Vec::new(),
        }
    }
}
