//! MigrateAllHandler - one-time sweep of legacy credits over every member.

use std::sync::Arc;
use tracing::{info, warn};

use super::{MigrateMemberCommand, MigrateMemberHandler};
use crate::application::batch::{BatchOutcome, MemberFailure};
use crate::application::publishing::new_run_id;
use crate::application::MemberRecordWriter;
use crate::domain::membership::LedgerError;

/// Counts from a migration sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub outcome: BatchOutcome,
    pub migrated: usize,
    /// Already on the ledger, or nothing to migrate.
    pub skipped: usize,
    pub errors: Vec<MemberFailure>,
}

pub struct MigrateAllHandler {
    writer: Arc<MemberRecordWriter>,
    member_handler: Arc<MigrateMemberHandler>,
}

impl MigrateAllHandler {
    pub fn new(writer: Arc<MemberRecordWriter>, member_handler: Arc<MigrateMemberHandler>) -> Self {
        Self {
            writer,
            member_handler,
        }
    }

    pub async fn handle(&self) -> Result<MigrationSummary, LedgerError> {
        let mut migrated = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();
        let run_id = new_run_id();

        for member_id in self.writer.list_ids().await? {
            let cmd = MigrateMemberCommand {
                member_id: member_id.clone(),
            };
            match self.member_handler.handle_in_run(cmd, &run_id).await {
                Ok(outcome) if outcome.is_migrated() => migrated += 1,
                Ok(_) => skipped += 1,
                Err(error) => {
                    warn!(member_id = %member_id, error = %error, "Legacy migration failed for member");
                    errors.push(MemberFailure { member_id, error });
                }
            }
        }

        let summary = MigrationSummary {
            outcome: BatchOutcome::from_counts(migrated, errors.len()),
            migrated,
            skipped,
            errors,
        };
        info!(
            run_id = %run_id,
            outcome = ?summary.outcome,
            migrated = summary.migrated,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "Legacy migration sweep finished"
        );
        Ok(summary)
    }
}
