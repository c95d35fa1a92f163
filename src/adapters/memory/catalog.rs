//! In-memory package catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{CatalogPackageId, DomainError};
use crate::domain::ledger::CatalogPackage;
use crate::ports::PackageCatalog;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPackageCatalog {
    entries: Arc<RwLock<HashMap<CatalogPackageId, CatalogPackage>>>,
}

impl InMemoryPackageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, package: CatalogPackage) {
        self.entries
            .write()
            .await
            .insert(package.id.clone(), package);
    }
}

#[async_trait]
impl PackageCatalog for InMemoryPackageCatalog {
    async fn find(&self, id: &CatalogPackageId) -> Result<Option<CatalogPackage>, DomainError> {
        Ok(self.entries.read().await.get(id).cloned())
    }
}
