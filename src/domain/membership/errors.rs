//! Ledger error taxonomy.
//!
//! Every single-member operation returns `Result<_, LedgerError>`; nothing
//! panics across the crate boundary. Callers branch on the variant, and
//! batch operations collect errors per member instead of aborting.
//!
//! | Error | Retryable |
//! |-------|-----------|
//! | PersistenceConflict | yes |
//! | StoreTimeout | yes |
//! | everything else | no |

use chrono::NaiveDate;
use thiserror::Error;

use super::MembershipStatus;
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Member not found: {member_id}")]
    MemberNotFound { member_id: String },

    #[error("Catalog package not found: {catalog_package_id}")]
    CatalogPackageNotFound { catalog_package_id: String },

    #[error("Package not found: {package_id}")]
    PackageNotFound { package_id: String },

    #[error("No package covers {date}")]
    NoPackageForDate { date: NaiveDate },

    #[error("No credits left in packages covering {date}")]
    NoCreditsInRange { date: NaiveDate },

    #[error("Freeze must end after {today}, got {planned_end}")]
    InvalidFreezeWindow {
        today: NaiveDate,
        planned_end: NaiveDate,
    },

    #[error("Member {member_id} is already frozen")]
    AlreadyFrozen { member_id: String },

    #[error("Member {member_id} is not frozen")]
    NotFrozen { member_id: String },

    #[error("Membership is {status}; lessons can only be booked for active members")]
    MembershipNotActive { status: MembershipStatus },

    #[error("Cannot {attempted} while {current}")]
    InvalidState { current: String, attempted: String },

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Concurrent update to {record} detected")]
    PersistenceConflict { record: String },

    #[error("Record store did not answer within {timeout_ms}ms")]
    StoreTimeout { timeout_ms: u64 },

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl LedgerError {
    pub fn member_not_found(member_id: impl ToString) -> Self {
        LedgerError::MemberNotFound {
            member_id: member_id.to_string(),
        }
    }

    pub fn catalog_package_not_found(id: impl ToString) -> Self {
        LedgerError::CatalogPackageNotFound {
            catalog_package_id: id.to_string(),
        }
    }

    pub fn package_not_found(id: impl ToString) -> Self {
        LedgerError::PackageNotFound {
            package_id: id.to_string(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        LedgerError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        LedgerError::Infrastructure(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            LedgerError::CatalogPackageNotFound { .. } => "CATALOG_PACKAGE_NOT_FOUND",
            LedgerError::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            LedgerError::NoPackageForDate { .. } => "NO_PACKAGE_FOR_DATE",
            LedgerError::NoCreditsInRange { .. } => "NO_CREDITS_IN_RANGE",
            LedgerError::InvalidFreezeWindow { .. } => "INVALID_FREEZE_WINDOW",
            LedgerError::AlreadyFrozen { .. } => "ALREADY_FROZEN",
            LedgerError::NotFrozen { .. } => "NOT_FROZEN",
            LedgerError::MembershipNotActive { .. } => "MEMBERSHIP_NOT_ACTIVE",
            LedgerError::InvalidState { .. } => "INVALID_STATE",
            LedgerError::ValidationFailed { .. } => "VALIDATION_FAILED",
            LedgerError::PersistenceConflict { .. } => "PERSISTENCE_CONFLICT",
            LedgerError::StoreTimeout { .. } => "STORE_TIMEOUT",
            LedgerError::Infrastructure(_) => "INFRASTRUCTURE",
        }
    }

    /// Returns true if the same call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::PersistenceConflict { .. } | LedgerError::StoreTimeout { .. }
        )
    }
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::VersionConflict => LedgerError::PersistenceConflict {
                record: err
                    .details
                    .get("record")
                    .cloned()
                    .unwrap_or_else(|| "member".to_string()),
            },
            ErrorCode::MemberNotFound => LedgerError::MemberNotFound {
                member_id: err
                    .details
                    .get("member_id")
                    .cloned()
                    .unwrap_or(err.message),
            },
            _ => LedgerError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
