//! MigrateMemberHandler - folds one member's legacy credit fields into the ledger.

use std::sync::Arc;
use tracing::info;

use crate::application::handlers::credit::legacy_migrated;
use crate::application::legacy::legacy_catalog_entry;
use crate::application::publishing::{publish_events, publish_run_events};
use crate::application::MemberRecordWriter;
use crate::domain::foundation::MemberId;
use crate::domain::ledger::{LegacyMigrator, MigrationOutcome, MIGRATION_ACTOR};
use crate::domain::membership::LedgerError;
use crate::ports::{Clock, EventPublisher, PackageCatalog};

#[derive(Debug, Clone)]
pub struct MigrateMemberCommand {
    pub member_id: MemberId,
}

/// Idempotent: a member that already has ledger entries is left alone and
/// nothing is written.
pub struct MigrateMemberHandler {
    writer: Arc<MemberRecordWriter>,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl MigrateMemberHandler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        catalog: Arc<dyn PackageCatalog>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            writer,
            catalog,
            clock,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: MigrateMemberCommand) -> Result<MigrationOutcome, LedgerError> {
        self.migrate(cmd, None).await
    }

    /// Migration as one step of the sweep identified by `run_id`.
    pub(crate) async fn handle_in_run(
        &self,
        cmd: MigrateMemberCommand,
        run_id: &str,
    ) -> Result<MigrationOutcome, LedgerError> {
        self.migrate(cmd, Some(run_id)).await
    }

    async fn migrate(&self, cmd: MigrateMemberCommand, run_id: Option<&str>) -> Result<MigrationOutcome, LedgerError> {
        let now = self.clock.timestamp();
        let mut current = self.writer.read(&cmd.member_id).await?.member;
        if !LegacyMigrator::needs_migration(&current) {
            // Reports why there is nothing to do; the record is not modified.
            return Ok(LegacyMigrator::migrate(&mut current, None, now));
        }
        let catalog_entry = legacy_catalog_entry(self.catalog.as_ref(), &current).await;

        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                Ok(LegacyMigrator::migrate(member, catalog_entry.as_ref(), now))
            })
            .await?;
        let outcome = committed.value;

        if let MigrationOutcome::Migrated { package_id } = outcome {
            info!(
                member_id = %cmd.member_id,
                package_id = %package_id,
                aggregate = committed.member.remaining_classes_aggregate,
                "Legacy credits migrated"
            );
            let event = legacy_migrated(&committed.member, package_id, now);
            let publisher = self.event_publisher.as_ref();
            match run_id {
                Some(run_id) => publish_run_events(publisher, vec![event], MIGRATION_ACTOR, run_id).await,
                None => publish_events(publisher, vec![event], MIGRATION_ACTOR).await,
            }
        }

        Ok(outcome)
    }
}
