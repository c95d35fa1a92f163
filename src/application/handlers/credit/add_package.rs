//! AddPackageHandler - assigns a new lesson package to a member.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use super::deduct_credit::legacy_migrated;
use crate::application::publishing::publish_events;
use crate::application::legacy::{migrate_in_place, prefetch_legacy_entry};
use crate::application::MemberRecordWriter;
use crate::domain::foundation::MemberId;
use crate::domain::ledger::terms::{resolve_terms, ResolutionContext};
use crate::domain::ledger::{MigrationOutcome, Package, PackageTerms};
use crate::domain::membership::{LedgerError, LedgerEvent};
use crate::ports::{Clock, EventPublisher, PackageCatalog};

#[derive(Debug, Clone)]
pub struct AddPackageCommand {
    pub member_id: MemberId,
    pub terms: PackageTerms,
    /// Defaults to today.
    pub start_date: Option<NaiveDate>,
    pub actor: String,
}

/// Handler for package assignment.
///
/// Catalog terms win over explicit ones. A member's first package also
/// inherits name and type from any legacy fields still on the record.
pub struct AddPackageHandler {
    writer: Arc<MemberRecordWriter>,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl AddPackageHandler {
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

    pub async fn handle(&self, cmd: AddPackageCommand) -> Result<Package, LedgerError> {
        let catalog_entry = match cmd.terms.catalog_id() {
            Some(id) => Some(
                self.catalog
                    .find(id)
                    .await?
                    .ok_or_else(|| LedgerError::catalog_package_not_found(id))?,
            ),
            None => None,
        };

        let legacy_entry = prefetch_legacy_entry(&self.writer, self.catalog.as_ref(), &cmd.member_id).await?;
        let now = self.clock.timestamp();
        let start_date = cmd.start_date.unwrap_or_else(|| self.clock.today());

        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                // Legacy credits must become a package before a new one lands,
                // otherwise the non-empty ledger would hide them for good.
                let migration = migrate_in_place(member, legacy_entry.as_ref(), now);
                let legacy = member.packages.is_empty().then_some(&member.legacy);
                let terms = resolve_terms(&ResolutionContext {
                    catalog: catalog_entry.as_ref(),
                    explicit: cmd.terms.explicit(),
                    legacy,
                })?;
                let package = member.assign_package(terms, start_date, &cmd.actor, now)?;
                Ok((migration, package))
            })
            .await?;
        let (migration, package) = committed.value;

        info!(
            member_id = %cmd.member_id,
            package_id = %package.id,
            total_lessons = package.total_lessons,
            expiry_date = %package.expiry_date,
            actor = %cmd.actor,
            "Package assigned"
        );

        let mut events = Vec::with_capacity(2);
        if let MigrationOutcome::Migrated { package_id } = migration {
            events.push(legacy_migrated(&committed.member, package_id, now));
        }
        events.push(LedgerEvent::PackageAssigned {
            member_id: cmd.member_id.clone(),
            package_id: package.id,
            name: package.name.clone(),
            package_type: package.package_type,
            total_lessons: package.total_lessons,
            start_date: package.start_date,
            expiry_date: package.expiry_date,
            assigned_by: package.assigned_by.clone(),
            occurred_at: now,
        });
        publish_events(self.event_publisher.as_ref(), events, &cmd.actor).await;

        Ok(package)
    }
}
