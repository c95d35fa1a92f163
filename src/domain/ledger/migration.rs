//! LegacyMigrator - converts pre-ledger member fields into a ledger entry.
//!
//! Older member records carried a single allocation as root-level fields
//! (`remaining_classes`, `package_expiry_date`, ...). Migration synthesizes
//! exactly one `is_legacy` package from them. A member that already has a
//! ledger is never touched, so running migration again is a no-op.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::terms::{name_chain, type_chain, ResolutionContext, DEFAULT_PACKAGE_NAME};
use super::{expiry_from_duration, CatalogPackage, ManualTerms, Package, PackageType};
use crate::domain::foundation::{CatalogPackageId, PackageId, Timestamp};
use crate::domain::membership::Member;

/// Actor recorded on synthesized packages.
pub const MIGRATION_ACTOR: &str = "legacy-migration";

/// Root-level credit fields of a pre-ledger member record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCredits {
    #[serde(default)]
    pub remaining_classes: Option<u32>,
    #[serde(default)]
    pub total_classes: Option<u32>,
    #[serde(default)]
    pub package_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub package_expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub package_type: Option<PackageType>,
    #[serde(default)]
    pub catalog_package_id: Option<CatalogPackageId>,
    /// Set once the fields have been folded into the ledger.
    #[serde(default)]
    pub migrated_at: Option<Timestamp>,
}

impl LegacyCredits {
    /// True if any credit count is non-zero.
    pub fn has_credits(&self) -> bool {
        self.remaining_classes.unwrap_or(0) > 0 || self.total_classes.unwrap_or(0) > 0
    }
}

/// Result of migrating one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum MigrationOutcome {
    /// A legacy package was synthesized.
    Migrated { package_id: PackageId },
    /// The member already has ledger entries.
    AlreadyLedger,
    /// Nothing to migrate.
    NoLegacyCredits,
}

impl MigrationOutcome {
    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationOutcome::Migrated { .. })
    }
}

pub struct LegacyMigrator;

impl LegacyMigrator {
    /// True if `migrate` would synthesize a package for this member.
    pub fn needs_migration(member: &Member) -> bool {
        member.packages.is_empty() && member.legacy.has_credits()
    }

    /// Folds legacy fields into the ledger and recomputes the aggregate.
    ///
    /// `catalog` is the definition referenced by the legacy fields, if it
    /// could be looked up; it only feeds name/type resolution.
    pub fn migrate(
        member: &mut Member,
        catalog: Option<&CatalogPackage>,
        now: Timestamp,
    ) -> MigrationOutcome {
        if !member.packages.is_empty() {
            return MigrationOutcome::AlreadyLedger;
        }
        if !member.legacy.has_credits() {
            return MigrationOutcome::NoLegacyCredits;
        }

        let package = Self::synthesize(&member.legacy, catalog, member.created_at.date(), now);
        let package_id = package.id;
        member.packages.push(package);
        member.legacy.migrated_at = Some(now);
        member.recompute_aggregate();

        MigrationOutcome::Migrated { package_id }
    }

    fn synthesize(
        legacy: &LegacyCredits,
        catalog: Option<&CatalogPackage>,
        member_since: NaiveDate,
        now: Timestamp,
    ) -> Package {
        let remaining = legacy.remaining_classes.unwrap_or(0);
        let total = legacy.total_classes.unwrap_or(remaining).max(remaining);

        let (start_date, expiry_date) = match (legacy.package_start_date, legacy.package_expiry_date) {
            (Some(start), Some(expiry)) => (start.min(expiry), expiry),
            (None, Some(expiry)) => (member_since.min(expiry), expiry),
            (Some(start), None) => (start, one_month_window_end(start)),
            (None, None) => {
                let start = now.date();
                (start, one_month_window_end(start))
            }
        };

        let explicit = ManualTerms::default();
        let ctx = ResolutionContext {
            catalog,
            explicit: &explicit,
            legacy: Some(legacy),
        };

        Package {
            id: PackageId::new(),
            catalog_package_id: legacy
                .catalog_package_id
                .clone()
                .or_else(|| catalog.map(|c| c.id.clone())),
            name: name_chain()
                .resolve(&ctx)
                .unwrap_or_else(|| DEFAULT_PACKAGE_NAME.to_string()),
            package_type: type_chain().resolve(&ctx).unwrap_or(PackageType::Group),
            start_date,
            expiry_date,
            total_lessons: total,
            remaining_lessons: remaining,
            assigned_at: now,
            assigned_by: MIGRATION_ACTOR.to_string(),
            is_legacy: true,
            cancellation: None,
            movements: Vec::new(),
        }
    }
}

/// End of a one-month window from `start`, clamped to the last representable
/// date.
fn one_month_window_end(start: NaiveDate) -> NaiveDate {
    expiry_from_duration(start, 1).unwrap_or(NaiveDate::MAX)
}
