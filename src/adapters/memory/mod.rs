//! In-memory adapters for tests and local runs.

mod catalog;
mod event_bus;
mod member_repository;

pub use catalog::InMemoryPackageCatalog;
pub use event_bus::InMemoryEventBus;
pub use member_repository::InMemoryMemberRepository;
