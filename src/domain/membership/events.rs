//! Ledger domain events.
//!
//! Raised after a member record write has committed. They feed audit
//! trails and downstream consumers (notifications, reporting); losing one
//! never invalidates the ledger itself.
//!
//! # Event Naming Convention
//!
//! Past tense, `<subject>.<verb>` routing keys with a `.v1` schema suffix.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{FreezeScope, MembershipStatus};
use crate::domain::foundation::{EventEnvelope, EventMetadata, MemberId, PackageId, Timestamp};
use crate::domain::ledger::{PackageType, RefundBasis};

/// Aggregate type stamped on every envelope.
pub const AGGREGATE_TYPE: &str = "Member";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    PackageAssigned {
        member_id: MemberId,
        package_id: PackageId,
        name: String,
        package_type: PackageType,
        total_lessons: u32,
        start_date: NaiveDate,
        expiry_date: NaiveDate,
        assigned_by: String,
        occurred_at: Timestamp,
    },

    CreditDeducted {
        member_id: MemberId,
        package_id: PackageId,
        lesson_date: NaiveDate,
        note: String,
        remaining_in_package: u32,
        aggregate: u32,
        occurred_at: Timestamp,
    },

    CreditRefunded {
        member_id: MemberId,
        package_id: PackageId,
        lesson_date: NaiveDate,
        note: String,
        basis: RefundBasis,
        remaining_in_package: u32,
        aggregate: u32,
        occurred_at: Timestamp,
    },

    PackageCancelled {
        member_id: MemberId,
        package_id: PackageId,
        cancelled_by: String,
        reason: Option<String>,
        occurred_at: Timestamp,
    },

    MemberFrozen {
        member_id: MemberId,
        scope: FreezeScope,
        reason: String,
        freeze_start_date: NaiveDate,
        planned_end_date: NaiveDate,
        planned_duration_days: i64,
        frozen_by: String,
        occurred_at: Timestamp,
    },

    MemberUnfrozen {
        member_id: MemberId,
        restored_status: MembershipStatus,
        actual_frozen_days: i64,
        unfrozen_by: String,
        occurred_at: Timestamp,
    },

    LegacyMigrated {
        member_id: MemberId,
        package_id: PackageId,
        remaining_lessons: u32,
        occurred_at: Timestamp,
    },

    /// Cached aggregate had drifted and was rewritten.
    AggregateCorrected {
        member_id: MemberId,
        previous: u32,
        corrected: u32,
        occurred_at: Timestamp,
    },
}

impl LedgerEvent {
    /// Routing key.
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::PackageAssigned { .. } => "package.assigned.v1",
            LedgerEvent::CreditDeducted { .. } => "credit.deducted.v1",
            LedgerEvent::CreditRefunded { .. } => "credit.refunded.v1",
            LedgerEvent::PackageCancelled { .. } => "package.cancelled.v1",
            LedgerEvent::MemberFrozen { .. } => "member.frozen.v1",
            LedgerEvent::MemberUnfrozen { .. } => "member.unfrozen.v1",
            LedgerEvent::LegacyMigrated { .. } => "legacy.migrated.v1",
            LedgerEvent::AggregateCorrected { .. } => "aggregate.corrected.v1",
        }
    }

    pub fn member_id(&self) -> &MemberId {
        match self {
            LedgerEvent::PackageAssigned { member_id, .. }
            | LedgerEvent::CreditDeducted { member_id, .. }
            | LedgerEvent::CreditRefunded { member_id, .. }
            | LedgerEvent::PackageCancelled { member_id, .. }
            | LedgerEvent::MemberFrozen { member_id, .. }
            | LedgerEvent::MemberUnfrozen { member_id, .. }
            | LedgerEvent::LegacyMigrated { member_id, .. }
            | LedgerEvent::AggregateCorrected { member_id, .. } => member_id,
        }
    }

    pub fn occurred_at(&self) -> Timestamp {
        match self {
            LedgerEvent::PackageAssigned { occurred_at, .. }
            | LedgerEvent::CreditDeducted { occurred_at, .. }
            | LedgerEvent::CreditRefunded { occurred_at, .. }
            | LedgerEvent::PackageCancelled { occurred_at, .. }
            | LedgerEvent::MemberFrozen { occurred_at, .. }
            | LedgerEvent::MemberUnfrozen { occurred_at, .. }
            | LedgerEvent::LegacyMigrated { occurred_at, .. }
            | LedgerEvent::AggregateCorrected { occurred_at, .. } => *occurred_at,
        }
    }

    /// Wraps the event for transport.
    pub fn to_envelope(&self, metadata: EventMetadata) -> EventEnvelope {
        let payload = serde_json::to_value(self).unwrap_or_default();
        EventEnvelope::new(
            self.event_type(),
            self.member_id().as_str(),
            AGGREGATE_TYPE,
            self.occurred_at(),
            payload,
        )
        .with_metadata(metadata)
    }
}
