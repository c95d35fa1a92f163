//! PostgreSQL store for members kept in the user directory.
//!
//! Older deployments keep members as `users` rows with `role = 'member'`.
//! Identity columns stay on the row; the credit fields (ledger, freeze,
//! legacy single-package fields) live in the `profile` JSON column next to
//! profile data the ledger does not own. Saves merge only the ledger keys
//! back into `profile`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use super::{db_error, serialization_error, to_db_version, to_version};
use crate::domain::foundation::{DomainError, ErrorCode, MemberId, Timestamp};
use crate::domain::ledger::{LegacyCredits, Package};
use crate::domain::membership::{FreezeHistoryEntry, FreezeRecord, Member, MembershipStatus};
use crate::ports::{MemberRepository, RecordSource, RecordVersion, VersionedMember};

const MEMBER_ROLE: &str = "member";

pub struct PostgresUserDirectoryRepository {
    pool: PgPool,
}

impl PostgresUserDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    display_name: String,
    membership_status: String,
    profile: serde_json::Value,
    deleted: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Ledger-owned keys of the `profile` column.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerProfile {
    #[serde(default)]
    packages: Vec<Package>,
    #[serde(default)]
    remaining_classes_aggregate: Option<u32>,
    #[serde(default)]
    freeze: Option<FreezeRecord>,
    #[serde(default)]
    freeze_history: Vec<FreezeHistoryEntry>,
    #[serde(flatten)]
    legacy: LegacyCredits,
}

impl TryFrom<UserRow> for Member {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let id = MemberId::new(row.id)
            .map_err(|e| DomainError::database(format!("Invalid member id: {}", e)))?;
        let profile: LedgerProfile = serde_json::from_value(row.profile)
            .map_err(|e| serialization_error("Malformed member profile", e))?;

        Ok(Member {
            id,
            display_name: row.display_name,
            membership_status: parse_status(&row.membership_status)?,
            packages: profile.packages,
            // A missing aggregate is recomputed by the next write or reconcile pass.
            remaining_classes_aggregate: profile.remaining_classes_aggregate.unwrap_or(0),
            freeze: profile.freeze,
            freeze_history: profile.freeze_history,
            legacy: profile.legacy,
            deleted: row.deleted,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<MembershipStatus, DomainError> {
    match s.trim().to_lowercase().as_str() {
        "pending" => Ok(MembershipStatus::Pending),
        "active" => Ok(MembershipStatus::Active),
        "frozen" => Ok(MembershipStatus::Frozen),
        "cancelled" | "canceled" => Ok(MembershipStatus::Cancelled),
        "rejected" => Ok(MembershipStatus::Rejected),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid membership status value: {}", s),
        )),
    }
}

fn ledger_profile(member: &Member) -> LedgerProfile {
    LedgerProfile {
        packages: member.packages.clone(),
        remaining_classes_aggregate: Some(member.remaining_classes_aggregate),
        freeze: member.freeze.clone(),
        freeze_history: member.freeze_history.clone(),
        legacy: member.legacy.clone(),
    }
}

#[async_trait]
impl MemberRepository for PostgresUserDirectoryRepository {
    async fn load(&self, id: &MemberId) -> Result<Option<VersionedMember>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, membership_status, profile, deleted, version,
                   created_at, updated_at
            FROM users
            WHERE id = $1 AND role = $2
            "#,
        )
        .bind(id.as_str())
        .bind(MEMBER_ROLE)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load member from users", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let version = to_version(row.version);
        Ok(Some(VersionedMember {
            member: Member::try_from(row)?,
            version: RecordVersion {
                source: RecordSource::Users,
                version,
            },
        }))
    }

    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, DomainError> {
        let patch = serde_json::to_value(ledger_profile(member))
            .map_err(|e| serialization_error("Failed to encode member profile", e))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users SET
                membership_status = $2,
                profile = profile || $3,
                version = version + 1,
                updated_at = $4
            WHERE id = $1 AND role = $5 AND version = $6
            RETURNING version
            "#,
        )
        .bind(member.id.as_str())
        .bind(member.membership_status.as_str())
        .bind(patch)
        .bind(member.updated_at.as_datetime())
        .bind(MEMBER_ROLE)
        .bind(to_db_version(expected.version))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save member to users", e))?;

        if let Some((version,)) = updated {
            return Ok(RecordVersion {
                source: RecordSource::Users,
                version: to_version(version),
            });
        }

        let current: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM users WHERE id = $1 AND role = $2")
                .bind(member.id.as_str())
                .bind(MEMBER_ROLE)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to read member version", e))?;

        match current {
            Some((actual,)) => Err(DomainError::version_conflict(
                member.id.as_str(),
                expected.version,
                to_version(actual),
            )),
            None => Err(
                DomainError::new(ErrorCode::MemberNotFound, "Member record not found")
                    .with_detail("member_id", member.id.as_str()),
            ),
        }
    }

    async fn list_ids(&self) -> Result<Vec<MemberId>, DomainError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM users WHERE role = $1 ORDER BY id")
            .bind(MEMBER_ROLE)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list members from users", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(id,)| MemberId::new(id).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn row(profile: serde_json::Value) -> UserRow {
        UserRow {
            id: "u-1".to_string(),
            display_name: "Grace".to_string(),
            membership_status: "active".to_string(),
            profile,
            deleted: false,
            version: 4,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_root_fields_are_read_from_profile() {
        let member = Member::try_from(row(json!({
            "remaining_classes": 6,
            "total_classes": 10,
            "package_expiry_date": "2025-03-01",
            "package_name": "10 Classes",
            "phone": "+1 555 0100"
        })))
        .unwrap();

        assert!(member.packages.is_empty());
        assert_eq!(member.legacy.remaining_classes, Some(6));
        assert_eq!(
            member.legacy.package_expiry_date,
            NaiveDate::from_ymd_opt(2025, 3, 1)
        );
        assert_eq!(member.membership_status, MembershipStatus::Active);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut r = row(json!({}));
        r.membership_status = "vip".to_string();
        assert!(Member::try_from(r).is_err());
    }

    #[test]
    fn ledger_profile_keeps_legacy_fields_at_top_level() {
        let mut member = Member::try_from(row(json!({"remaining_classes": 2}))).unwrap();
        member.remaining_classes_aggregate = 0;

        let value = serde_json::to_value(ledger_profile(&member)).unwrap();
        assert_eq!(value["remaining_classes"], 2);
        assert_eq!(value["remaining_classes_aggregate"], 0);
        assert!(value.get("legacy").is_none());
    }
}
