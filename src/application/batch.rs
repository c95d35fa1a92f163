//! Shared result types for operations that walk the whole member population.

use serde::Serialize;

use crate::domain::foundation::MemberId;
use crate::domain::membership::LedgerError;

/// Overall verdict of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// At least one member changed and nothing failed.
    Success,
    /// Some members changed, some failed.
    Partial,
    /// Nothing changed and at least one member failed.
    Failed,
    /// Nothing to do.
    NoOp,
}

impl BatchOutcome {
    pub fn from_counts(changed: usize, failed: usize) -> Self {
        match (changed, failed) {
            (0, 0) => BatchOutcome::NoOp,
            (_, 0) => BatchOutcome::Success,
            (0, _) => BatchOutcome::Failed,
            _ => BatchOutcome::Partial,
        }
    }
}

/// One member's failure inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFailure {
    pub member_id: MemberId,
    pub error: LedgerError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_separates_partial_from_failed() {
        assert_eq!(BatchOutcome::from_counts(0, 0), BatchOutcome::NoOp);
        assert_eq!(BatchOutcome::from_counts(3, 0), BatchOutcome::Success);
        assert_eq!(BatchOutcome::from_counts(3, 1), BatchOutcome::Partial);
        assert_eq!(BatchOutcome::from_counts(0, 2), BatchOutcome::Failed);
    }
}
