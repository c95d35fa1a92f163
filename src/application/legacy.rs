//! Lazy migration of legacy credit fields.
//!
//! Whichever path migrates a member first (a booking, a new package or the
//! sweep), the synthesized package is resolved against the same catalog
//! entry, so its name and type do not depend on who got there first.

use tracing::warn;

use crate::application::MemberRecordWriter;
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::ledger::{CatalogPackage, LegacyMigrator, MigrationOutcome};
use crate::domain::membership::{LedgerError, Member};
use crate::ports::PackageCatalog;

/// Catalog definition referenced by a member's unmigrated legacy fields.
///
/// `None` when the member needs no migration or references no entry. A
/// missing or unreadable entry only costs name and type resolution.
pub(crate) async fn legacy_catalog_entry(catalog: &dyn PackageCatalog, member: &Member) -> Option<CatalogPackage> {
    if !LegacyMigrator::needs_migration(member) {
        return None;
    }
    let id = member.legacy.catalog_package_id.as_ref()?;
    match catalog.find(id).await {
        Ok(Some(entry)) => Some(entry),
        Ok(None) => {
            warn!(member_id = %member.id, catalog_package_id = %id, "Legacy catalog package not found");
            None
        }
        Err(e) => {
            warn!(member_id = %member.id, catalog_package_id = %id, error = %e, "Catalog lookup failed");
            None
        }
    }
}

/// Reads the member and resolves its legacy catalog entry ahead of an update.
pub(crate) async fn prefetch_legacy_entry(
    writer: &MemberRecordWriter,
    catalog: &dyn PackageCatalog,
    member_id: &MemberId,
) -> Result<Option<CatalogPackage>, LedgerError> {
    let current = writer.read(member_id).await?;
    Ok(legacy_catalog_entry(catalog, &current.member).await)
}

/// Folds legacy credit fields into the ledger before an operation.
///
/// Runs inside the caller's mutation so the synthesized package commits
/// together with the operation that needed it. `entry` is ignored unless it
/// is the one the legacy fields reference.
pub(crate) fn migrate_in_place(
    member: &mut Member,
    entry: Option<&CatalogPackage>,
    now: Timestamp,
) -> MigrationOutcome {
    if !LegacyMigrator::needs_migration(member) {
        return MigrationOutcome::AlreadyLedger;
    }
    let entry = entry.filter(|e| member.legacy.catalog_package_id.as_ref() == Some(&e.id));
    LegacyMigrator::migrate(member, entry, now)
}
