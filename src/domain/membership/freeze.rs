//! Freeze record types.
//!
//! A `FreezeRecord` exists only while a member is frozen. It carries the
//! pre-freeze expiries so unfreeze can recompute each one from its original
//! value instead of extending an already extended date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::MembershipStatus;
use crate::domain::foundation::{PackageId, Timestamp};

/// Who initiated a freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezeScope {
    /// Frozen for one member. Bulk unfreeze leaves these alone.
    Individual,
    /// Frozen by a studio-wide batch.
    Group,
}

impl fmt::Display for FreezeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreezeScope::Individual => f.write_str("individual"),
            FreezeScope::Group => f.write_str("group"),
        }
    }
}

/// Expiry of one package when the freeze began.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageExpiry {
    pub package_id: PackageId,
    pub expiry_date: NaiveDate,
}

/// State captured at freeze time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeSnapshot {
    pub membership_status: MembershipStatus,
    #[serde(default)]
    pub package_expiries: Vec<PackageExpiry>,
}

impl FreezeSnapshot {
    pub fn original_expiry(&self, package_id: &PackageId) -> Option<NaiveDate> {
        self.package_expiries
            .iter()
            .find(|e| &e.package_id == package_id)
            .map(|e| e.expiry_date)
    }
}

/// Active freeze on a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeRecord {
    pub freeze_start_date: NaiveDate,
    pub freeze_end_date_planned: NaiveDate,
    /// Inclusive day count of the planned window.
    pub planned_duration_days: i64,
    pub reason: String,
    pub frozen_by: String,
    pub freeze_scope: FreezeScope,
    pub frozen_at: Timestamp,
    pub snapshot: FreezeSnapshot,
}

impl FreezeRecord {
    /// True once the planned window lies entirely in the past.
    pub fn has_lapsed(&self, today: NaiveDate) -> bool {
        today > self.freeze_end_date_planned
    }
}

/// Input for a single freeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeRequest {
    pub reason: String,
    pub planned_end: NaiveDate,
    pub actor: String,
    pub scope: FreezeScope,
}

/// Completed freeze, kept on the member after unfreeze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeHistoryEntry {
    pub freeze_start_date: NaiveDate,
    pub freeze_end_date_planned: NaiveDate,
    pub unfrozen_on: NaiveDate,
    pub planned_duration_days: i64,
    pub actual_frozen_days: i64,
    pub frozen_by: String,
    pub unfrozen_by: String,
    pub reason: String,
    #[serde(default)]
    pub unfreeze_reason: Option<String>,
    pub freeze_scope: FreezeScope,
}

impl FreezeHistoryEntry {
    pub(crate) fn close(
        record: &FreezeRecord,
        unfrozen_on: NaiveDate,
        actual_frozen_days: i64,
        unfrozen_by: &str,
        unfreeze_reason: Option<String>,
    ) -> Self {
        Self {
            freeze_start_date: record.freeze_start_date,
            freeze_end_date_planned: record.freeze_end_date_planned,
            unfrozen_on,
            planned_duration_days: record.planned_duration_days,
            actual_frozen_days,
            frozen_by: record.frozen_by.clone(),
            unfrozen_by: unfrozen_by.to_string(),
            reason: record.reason.clone(),
            unfreeze_reason,
            freeze_scope: record.freeze_scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(snapshot: FreezeSnapshot) -> FreezeRecord {
        FreezeRecord {
            freeze_start_date: date(2025, 1, 10),
            freeze_end_date_planned: date(2025, 1, 20),
            planned_duration_days: 11,
            reason: "injury".to_string(),
            frozen_by: "admin".to_string(),
            freeze_scope: FreezeScope::Individual,
            frozen_at: Timestamp::start_of_day(date(2025, 1, 10)),
            snapshot,
        }
    }

    #[test]
    fn lapses_only_after_planned_end_day() {
        let r = record(FreezeSnapshot {
            membership_status: MembershipStatus::Active,
            package_expiries: vec![],
        });
        assert!(!r.has_lapsed(date(2025, 1, 20)));
        assert!(r.has_lapsed(date(2025, 1, 21)));
    }

    #[test]
    fn snapshot_looks_up_original_expiry() {
        let id = PackageId::new();
        let snapshot = FreezeSnapshot {
            membership_status: MembershipStatus::Active,
            package_expiries: vec![PackageExpiry {
                package_id: id,
                expiry_date: date(2025, 1, 31),
            }],
        };
        assert_eq!(snapshot.original_expiry(&id), Some(date(2025, 1, 31)));
        assert_eq!(snapshot.original_expiry(&PackageId::new()), None);
    }

    #[test]
    fn history_entry_copies_freeze_audit_fields() {
        let r = record(FreezeSnapshot {
            membership_status: MembershipStatus::Active,
            package_expiries: vec![],
        });
        let entry = FreezeHistoryEntry::close(&r, date(2025, 1, 15), 5, "front-desk", None);
        assert_eq!(entry.frozen_by, "admin");
        assert_eq!(entry.unfrozen_by, "front-desk");
        assert_eq!(entry.actual_frozen_days, 5);
        assert_eq!(entry.freeze_scope, FreezeScope::Individual);
    }

    #[test]
    fn scope_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&FreezeScope::Group).unwrap(), "\"group\"");
    }
}
