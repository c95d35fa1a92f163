//! ListMembersHandler - members overview with derived package statuses.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::AutoReconciler;
use crate::application::MemberRecordWriter;
use crate::domain::ledger::{Package, PackageStatus};
use crate::domain::membership::{LedgerError, Member};
use crate::ports::Clock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageView {
    pub package: Package,
    pub status: PackageStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberOverview {
    pub member: Member,
    pub packages: Vec<PackageView>,
}

/// Bulk read. Reconciles first so the overview never shows a drifted
/// aggregate or a freeze that should already have ended.
pub struct ListMembersHandler {
    writer: Arc<MemberRecordWriter>,
    reconciler: Arc<AutoReconciler>,
    clock: Arc<dyn Clock>,
}

impl ListMembersHandler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        reconciler: Arc<AutoReconciler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            writer,
            reconciler,
            clock,
        }
    }

    pub async fn handle(&self) -> Result<Vec<MemberOverview>, LedgerError> {
        match self.reconciler.run().await {
            Ok(report) if !report.errors.is_empty() => {
                warn!(errors = report.errors.len(), "Reconciliation before listing had failures");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Reconciliation before listing failed"),
        }

        let today = self.clock.today();
        let mut overview = Vec::new();
        for member_id in self.writer.list_ids().await? {
            let member = match self.writer.read(&member_id).await {
                Ok(loaded) => loaded.member,
                // Removed between listing and reading.
                Err(LedgerError::MemberNotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            if member.deleted {
                continue;
            }
            let packages = member
                .package_statuses(today)
                .into_iter()
                .map(|(package, status)| PackageView {
                    package: package.clone(),
                    status,
                })
                .collect();
            overview.push(MemberOverview { member, packages });
        }
        Ok(overview)
    }
}
