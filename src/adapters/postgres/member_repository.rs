//! PostgreSQL store for whole member documents.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{db_error, serialization_error, to_db_version, to_version};
use crate::domain::foundation::{DomainError, ErrorCode, MemberId};
use crate::domain::membership::Member;
use crate::ports::{MemberRepository, RecordSource, RecordVersion, VersionedMember};

pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    document: serde_json::Value,
    version: i64,
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn load(&self, id: &MemberId) -> Result<Option<VersionedMember>, DomainError> {
        let row: Option<MemberRow> =
            sqlx::query_as("SELECT document, version FROM members WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load member", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let member: Member = serde_json::from_value(row.document)
            .map_err(|e| serialization_error("Malformed member document", e))?;

        Ok(Some(VersionedMember {
            member,
            version: RecordVersion {
                source: RecordSource::Members,
                version: to_version(row.version),
            },
        }))
    }

    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, DomainError> {
        let document = serde_json::to_value(member)
            .map_err(|e| serialization_error("Failed to encode member", e))?;

        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE members SET
                document = $2,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $3
            RETURNING version
            "#,
        )
        .bind(member.id.as_str())
        .bind(document)
        .bind(to_db_version(expected.version))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save member", e))?;

        if let Some((version,)) = updated {
            return Ok(RecordVersion {
                source: RecordSource::Members,
                version: to_version(version),
            });
        }

        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM members WHERE id = $1")
            .bind(member.id.as_str())
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
        let rows: Vec<(String,)> = sqlx::query_as("SELECT id FROM members ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list members", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(id,)| MemberId::new(id).ok())
            .collect())
    }
}
