//! Package catalog port.
//!
//! The ledger only reads catalog definitions; administering the catalog
//! belongs to another subsystem.

use async_trait::async_trait;

use crate::domain::foundation::{CatalogPackageId, DomainError};
use crate::domain::ledger::CatalogPackage;

#[async_trait]
pub trait PackageCatalog: Send + Sync {
    /// Looks up one package definition. Returns `None` if it does not exist.
    async fn find(&self, id: &CatalogPackageId) -> Result<Option<CatalogPackage>, DomainError>;
}
