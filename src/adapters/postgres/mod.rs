//! PostgreSQL adapters.
//!
//! Member records exist in two shapes: whole documents in `members`, and
//! user-directory rows in `users` whose credit fields sit inside a
//! `profile` JSON column. `FallbackMemberRepository` resolves a member
//! against both, once per call.

mod catalog;
mod fallback;
mod member_repository;
mod user_directory_repository;

pub use catalog::PostgresPackageCatalog;
pub use fallback::FallbackMemberRepository;
pub use member_repository::PostgresMemberRepository;
pub use user_directory_repository::PostgresUserDirectoryRepository;

use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Applies the bundled schema migrations.
pub async fn run_schema_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Schema migration failed: {}", e)))
}

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, err))
}

fn serialization_error(context: &str, err: serde_json::Error) -> DomainError {
    DomainError::new(ErrorCode::SerializationError, format!("{}: {}", context, err))
}

fn to_version(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or(0)
}

fn to_db_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}
