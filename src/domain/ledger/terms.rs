//! Package terms resolution.
//!
//! Name, type, size and duration of a new allocation can come from the
//! catalog, from explicit admin input, or from a member's pre-ledger
//! fields. Each attribute is resolved by an ordered chain of resolvers;
//! the first one that yields a value wins.

use serde::{Deserialize, Serialize};

use super::{LegacyCredits, PackageType, ResolvedTerms};
use crate::domain::foundation::{CatalogPackageId, ValidationError};

/// Name used when no source provides one.
pub const DEFAULT_PACKAGE_NAME: &str = "Lesson Package";

/// Upper bound on lessons in one allocation.
pub const MAX_LESSONS_PER_PACKAGE: u32 = 500;

/// Upper bound on package duration.
pub const MAX_DURATION_MONTHS: u32 = 36;

/// Package definition read from the external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPackage {
    pub id: CatalogPackageId,
    pub name: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub total_lessons: u32,
    pub duration_months: u32,
    /// Price in cents.
    pub price_cents: i64,
}

/// Admin-supplied terms. Any field may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTerms {
    pub name: Option<String>,
    pub package_type: Option<PackageType>,
    pub total_lessons: Option<u32>,
    pub duration_months: Option<u32>,
}

/// Source of a new allocation's terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageTerms {
    /// Look the definition up in the catalog; `overrides` fill gaps only.
    Catalog {
        id: CatalogPackageId,
        overrides: ManualTerms,
    },
    /// Terms typed in by an admin.
    Manual(ManualTerms),
}

impl PackageTerms {
    pub fn catalog(id: CatalogPackageId) -> Self {
        PackageTerms::Catalog {
            id,
            overrides: ManualTerms::default(),
        }
    }

    pub fn catalog_id(&self) -> Option<&CatalogPackageId> {
        match self {
            PackageTerms::Catalog { id, .. } => Some(id),
            PackageTerms::Manual(_) => None,
        }
    }

    pub fn explicit(&self) -> &ManualTerms {
        match self {
            PackageTerms::Catalog { overrides, .. } => overrides,
            PackageTerms::Manual(terms) => terms,
        }
    }
}

/// Everything a resolver may look at.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub catalog: Option<&'a CatalogPackage>,
    pub explicit: &'a ManualTerms,
    pub legacy: Option<&'a LegacyCredits>,
}

type Resolver<T> = fn(&ResolutionContext<'_>) -> Option<T>;

/// Ordered list of named resolvers for one attribute.
pub struct ResolverChain<T> {
    steps: Vec<(&'static str, Resolver<T>)>,
}

impl<T> ResolverChain<T> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn then(mut self, name: &'static str, resolver: Resolver<T>) -> Self {
        self.steps.push((name, resolver));
        self
    }

    /// Value from the first resolver that yields one.
    pub fn resolve(&self, ctx: &ResolutionContext<'_>) -> Option<T> {
        self.resolve_with_source(ctx).map(|(_, value)| value)
    }

    /// Like `resolve`, also naming the resolver that answered.
    pub fn resolve_with_source(&self, ctx: &ResolutionContext<'_>) -> Option<(&'static str, T)> {
        self.steps
            .iter()
            .find_map(|(name, resolver)| resolver(ctx).map(|value| (*name, value)))
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|(name, _)| *name).collect()
    }
}

impl<T> Default for ResolverChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// catalog -> explicit -> legacy -> default
pub fn name_chain() -> ResolverChain<String> {
    ResolverChain::new()
        .then("catalog", |ctx| ctx.catalog.and_then(|c| non_blank(&c.name)))
        .then("explicit", |ctx| ctx.explicit.name.as_deref().and_then(non_blank))
        .then("legacy", |ctx| {
            ctx.legacy
                .and_then(|l| l.package_name.as_deref())
                .and_then(non_blank)
        })
        .then("default", |_| Some(DEFAULT_PACKAGE_NAME.to_string()))
}

/// catalog -> explicit -> legacy -> default (group)
pub fn type_chain() -> ResolverChain<PackageType> {
    ResolverChain::new()
        .then("catalog", |ctx| ctx.catalog.map(|c| c.package_type))
        .then("explicit", |ctx| ctx.explicit.package_type)
        .then("legacy", |ctx| ctx.legacy.and_then(|l| l.package_type))
        .then("default", |_| Some(PackageType::Group))
}

/// catalog -> explicit
pub fn total_lessons_chain() -> ResolverChain<u32> {
    ResolverChain::new()
        .then("catalog", |ctx| ctx.catalog.map(|c| c.total_lessons))
        .then("explicit", |ctx| ctx.explicit.total_lessons)
}

/// catalog -> explicit
pub fn duration_chain() -> ResolverChain<u32> {
    ResolverChain::new()
        .then("catalog", |ctx| ctx.catalog.map(|c| c.duration_months))
        .then("explicit", |ctx| ctx.explicit.duration_months)
}

/// Resolves and validates every attribute of a new allocation.
pub fn resolve_terms(ctx: &ResolutionContext<'_>) -> Result<ResolvedTerms, ValidationError> {
    let total_lessons = total_lessons_chain()
        .resolve(ctx)
        .ok_or_else(|| ValidationError::empty_field("total_lessons"))?;
    if total_lessons == 0 || total_lessons > MAX_LESSONS_PER_PACKAGE {
        return Err(ValidationError::out_of_range(
            "total_lessons",
            1,
            i64::from(MAX_LESSONS_PER_PACKAGE),
            i64::from(total_lessons),
        ));
    }

    let duration_months = duration_chain()
        .resolve(ctx)
        .ok_or_else(|| ValidationError::empty_field("duration_months"))?;
    if duration_months == 0 || duration_months > MAX_DURATION_MONTHS {
        return Err(ValidationError::out_of_range(
            "duration_months",
            1,
            i64::from(MAX_DURATION_MONTHS),
            i64::from(duration_months),
        ));
    }

    Ok(ResolvedTerms {
        catalog_package_id: ctx.catalog.map(|c| c.id.clone()),
        name: name_chain()
            .resolve(ctx)
            .unwrap_or_else(|| DEFAULT_PACKAGE_NAME.to_string()),
        package_type: type_chain().resolve(ctx).unwrap_or(PackageType::Group),
        total_lessons,
        duration_months,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_entry() -> CatalogPackage {
        CatalogPackage {
            id: CatalogPackageId::new("duo-10").unwrap(),
            name: "10 Duo Sessions".to_string(),
            package_type: PackageType::Duo,
            total_lessons: 10,
            duration_months: 3,
            price_cents: 45_000,
        }
    }

    fn legacy() -> LegacyCredits {
        LegacyCredits {
            package_name: Some("Old Private Pack".to_string()),
            package_type: Some(PackageType::OneOnOne),
            total_classes: Some(12),
            ..LegacyCredits::default()
        }
    }

    #[test]
    fn catalog_wins_over_explicit_and_legacy() {
        let catalog = catalog_entry();
        let explicit = ManualTerms {
            name: Some("Custom".to_string()),
            ..ManualTerms::default()
        };
        let legacy = legacy();
        let ctx = ResolutionContext {
            catalog: Some(&catalog),
            explicit: &explicit,
            legacy: Some(&legacy),
        };

        assert_eq!(
            name_chain().resolve_with_source(&ctx),
            Some(("catalog", "10 Duo Sessions".to_string()))
        );
        assert_eq!(type_chain().resolve(&ctx), Some(PackageType::Duo));
    }

    #[test]
    fn explicit_fills_in_without_catalog() {
        let explicit = ManualTerms {
            name: Some("  Summer Intensive ".to_string()),
            package_type: Some(PackageType::OneOnOne),
            total_lessons: Some(6),
            duration_months: Some(1),
        };
        let ctx = ResolutionContext {
            catalog: None,
            explicit: &explicit,
            legacy: None,
        };

        let terms = resolve_terms(&ctx).unwrap();
        assert_eq!(terms.name, "Summer Intensive");
        assert_eq!(terms.package_type, PackageType::OneOnOne);
        assert_eq!(terms.total_lessons, 6);
        assert!(terms.catalog_package_id.is_none());
    }

    #[test]
    fn blank_explicit_name_falls_through_to_legacy() {
        let explicit = ManualTerms {
            name: Some("   ".to_string()),
            ..ManualTerms::default()
        };
        let legacy = legacy();
        let ctx = ResolutionContext {
            catalog: None,
            explicit: &explicit,
            legacy: Some(&legacy),
        };

        assert_eq!(
            name_chain().resolve_with_source(&ctx),
            Some(("legacy", "Old Private Pack".to_string()))
        );
    }

    #[test]
    fn defaults_close_the_chain() {
        let explicit = ManualTerms::default();
        let ctx = ResolutionContext {
            catalog: None,
            explicit: &explicit,
            legacy: None,
        };

        assert_eq!(name_chain().resolve(&ctx), Some(DEFAULT_PACKAGE_NAME.to_string()));
        assert_eq!(type_chain().resolve(&ctx), Some(PackageType::Group));
        assert_eq!(
            name_chain().step_names(),
            vec!["catalog", "explicit", "legacy", "default"]
        );
    }

    #[test]
    fn resolve_terms_takes_catalog_sizes() {
        let catalog = catalog_entry();
        let explicit = ManualTerms::default();
        let ctx = ResolutionContext {
            catalog: Some(&catalog),
            explicit: &explicit,
            legacy: None,
        };

        let terms = resolve_terms(&ctx).unwrap();
        assert_eq!(terms.total_lessons, 10);
        assert_eq!(terms.duration_months, 3);
        assert_eq!(terms.catalog_package_id, Some(catalog.id));
    }

    #[test]
    fn resolve_terms_requires_lessons_and_duration() {
        let missing_duration = ManualTerms {
            total_lessons: Some(8),
            ..ManualTerms::default()
        };
        let ctx = ResolutionContext {
            catalog: None,
            explicit: &missing_duration,
            legacy: None,
        };
        assert_eq!(
            resolve_terms(&ctx),
            Err(ValidationError::empty_field("duration_months"))
        );

        let zero_lessons = ManualTerms {
            total_lessons: Some(0),
            duration_months: Some(1),
            ..ManualTerms::default()
        };
        let ctx = ResolutionContext {
            catalog: None,
            explicit: &zero_lessons,
            legacy: None,
        };
        assert!(matches!(
            resolve_terms(&ctx),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
