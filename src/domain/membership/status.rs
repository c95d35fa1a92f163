//! Membership status state machine.
//!
//! Only `Active <-> Frozen` is reversible. Cancelled and rejected members
//! never come back through the ledger.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Studio membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Signed up, awaiting approval. Holds no bookable allocations.
    Pending,

    /// May book lessons.
    Active,

    /// Expiry clocks stopped; bookings refused until unfreeze.
    Frozen,

    /// Left the studio.
    Cancelled,

    /// Sign-up was declined.
    Rejected,
}

impl MembershipStatus {
    /// Returns true if lessons may be booked against this member.
    pub fn can_book(&self) -> bool {
        matches!(self, MembershipStatus::Active)
    }

    /// Returns true if new packages may be assigned in this status.
    pub fn accepts_packages(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Active | MembershipStatus::Frozen | MembershipStatus::Pending
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
            MembershipStatus::Frozen => "frozen",
            MembershipStatus::Cancelled => "cancelled",
            MembershipStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for MembershipStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Rejected)
                | (Active, Frozen)
                | (Active, Cancelled)
                | (Frozen, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipStatus::*;
        match self {
            Pending => vec![Active, Rejected],
            Active => vec![Frozen, Cancelled],
            Frozen => vec![Active],
            Cancelled | Rejected => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_freeze_and_come_back() {
        let frozen = MembershipStatus::Active
            .transition_to(MembershipStatus::Frozen)
            .unwrap();
        assert_eq!(frozen, MembershipStatus::Frozen);
        assert_eq!(
            frozen.transition_to(MembershipStatus::Active),
            Ok(MembershipStatus::Active)
        );
    }

    #[test]
    fn frozen_cannot_freeze_again() {
        assert!(MembershipStatus::Frozen
            .transition_to(MembershipStatus::Frozen)
            .is_err());
    }

    #[test]
    fn pending_cannot_freeze() {
        assert!(!MembershipStatus::Pending.can_transition_to(&MembershipStatus::Frozen));
    }

    #[test]
    fn cancelled_and_rejected_are_terminal() {
        assert!(MembershipStatus::Cancelled.is_terminal());
        assert!(MembershipStatus::Rejected.is_terminal());
        assert!(!MembershipStatus::Frozen.is_terminal());
    }

    #[test]
    fn only_active_members_can_book() {
        assert!(MembershipStatus::Active.can_book());
        assert!(!MembershipStatus::Frozen.can_book());
        assert!(!MembershipStatus::Pending.can_book());
        assert!(!MembershipStatus::Cancelled.can_book());
    }

    #[test]
    fn package_assignment_is_refused_for_closed_members() {
        assert!(MembershipStatus::Frozen.accepts_packages());
        assert!(MembershipStatus::Pending.accepts_packages());
        assert!(!MembershipStatus::Cancelled.accepts_packages());
        assert!(!MembershipStatus::Rejected.accepts_packages());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&MembershipStatus::Frozen).unwrap();
        assert_eq!(json, "\"frozen\"");
    }
}
