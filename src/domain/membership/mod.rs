//! Member domain - the member record sub-tree owned by the credit ledger.
//!
//! # Module Structure
//!
//! - `aggregate` - Member aggregate and per-member ledger operations
//! - `status` - Membership status state machine
//! - `freeze` - Freeze record, snapshot and history
//! - `errors` - Ledger error taxonomy
//! - `events` - Ledger domain events

mod aggregate;
mod errors;
mod events;
mod freeze;
mod status;

pub use aggregate::{DeductionResult, Eligibility, Ineligibility, Member, RefundResult, UnfreezeResult};
pub use errors::LedgerError;
pub use events::{LedgerEvent, AGGREGATE_TYPE};
pub use freeze::{
    FreezeHistoryEntry, FreezeRecord, FreezeRequest, FreezeScope, FreezeSnapshot, PackageExpiry,
};
pub use status::MembershipStatus;

#[cfg(test)]
pub(crate) use aggregate::test_support;
