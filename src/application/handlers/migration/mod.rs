//! Migration handlers - lazy per-member and population-wide legacy migration.

mod migrate_all;
mod migrate_member;

pub use migrate_all::{MigrateAllHandler, MigrationSummary};
pub use migrate_member::{MigrateMemberCommand, MigrateMemberHandler};
