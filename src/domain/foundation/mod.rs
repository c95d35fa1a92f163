//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the ledger domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventEnvelope, EventId, EventMetadata};
pub use ids::{CatalogPackageId, MemberId, PackageId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
