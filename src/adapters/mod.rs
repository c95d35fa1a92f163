//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - In-process member store, catalog and event bus
//! - `postgres` - PostgreSQL member stores (both record shapes) and catalog
//! - `clock` - System and fixed clocks
//! - `log_publisher` - Event publisher backed by tracing

pub mod clock;
pub mod log_publisher;
pub mod memory;
pub mod postgres;

pub use clock::{FixedClock, SystemClock};
pub use log_publisher::LogEventPublisher;
pub use memory::{InMemoryEventBus, InMemoryMemberRepository, InMemoryPackageCatalog};
pub use postgres::{
    FallbackMemberRepository, PostgresMemberRepository, PostgresPackageCatalog,
    PostgresUserDirectoryRepository,
};
