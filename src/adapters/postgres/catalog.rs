//! PostgreSQL package catalog lookup.

use async_trait::async_trait;
use sqlx::PgPool;

use super::db_error;
use crate::domain::foundation::{CatalogPackageId, DomainError, ErrorCode};
use crate::domain::ledger::{CatalogPackage, PackageType};
use crate::ports::PackageCatalog;

pub struct PostgresPackageCatalog {
    pool: PgPool,
}

impl PostgresPackageCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: String,
    name: String,
    package_type: String,
    total_lessons: i32,
    duration_months: i32,
    price_cents: i64,
}

impl TryFrom<CatalogRow> for CatalogPackage {
    type Error = DomainError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let invalid = |field: &str, value: String| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid catalog {} value: {}", field, value),
            )
        };
        Ok(CatalogPackage {
            package_type: PackageType::parse(&row.package_type)
                .ok_or_else(|| invalid("package_type", row.package_type.clone()))?,
            total_lessons: u32::try_from(row.total_lessons)
                .map_err(|_| invalid("total_lessons", row.total_lessons.to_string()))?,
            duration_months: u32::try_from(row.duration_months)
                .map_err(|_| invalid("duration_months", row.duration_months.to_string()))?,
            id: CatalogPackageId::new(row.id)
                .map_err(|e| DomainError::database(format!("Invalid catalog id: {}", e)))?,
            name: row.name,
            price_cents: row.price_cents,
        })
    }
}

#[async_trait]
impl PackageCatalog for PostgresPackageCatalog {
    async fn find(&self, id: &CatalogPackageId) -> Result<Option<CatalogPackage>, DomainError> {
        let row: Option<CatalogRow> = sqlx::query_as(
            r#"
            SELECT id, name, package_type, total_lessons, duration_months, price_cents
            FROM catalog_packages
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to look up catalog package", e))?;

        row.map(CatalogPackage::try_from).transpose()
    }
}
