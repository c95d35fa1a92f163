//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the ledger and the outside world. Adapters implement these ports.
//!
//! - `MemberRepository` - Versioned read/replace of one member record
//! - `PackageCatalog` - Read-only catalog lookup
//! - `Clock` - Current instant and calendar day
//! - `EventPublisher` - Announces committed ledger changes

mod clock;
mod event_publisher;
mod member_repository;
mod package_catalog;

pub use clock::Clock;
pub use event_publisher::EventPublisher;
pub use member_repository::{MemberRepository, RecordSource, RecordVersion, VersionedMember};
pub use package_catalog::PackageCatalog;
