//! Member repository port.
//!
//! Member records live in one of two differently shaped collections. The
//! repository hides that: `load` reports which shape answered and `save`
//! writes back to the same one, so nothing downstream branches on shape.
//!
//! # Concurrency
//!
//! Every record carries a version that increases on each write. `save`
//! succeeds only if the stored version still equals the one that was
//! loaded; otherwise it fails with `ErrorCode::VersionConflict` and the
//! caller re-reads and retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DomainError, MemberId};
use crate::domain::membership::Member;

/// Collection a member record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Dedicated member documents.
    Members,
    /// User-directory records with the member role.
    Users,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSource::Members => f.write_str("members"),
            RecordSource::Users => f.write_str("users"),
        }
    }
}

/// Where a record came from and which version was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordVersion {
    pub source: RecordSource,
    pub version: u64,
}

/// A loaded member together with the version to write against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedMember {
    pub member: Member,
    pub version: RecordVersion,
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Loads one member. Returns `None` if no collection holds it.
    async fn load(&self, id: &MemberId) -> Result<Option<VersionedMember>, DomainError>;

    /// Replaces the whole member record if it is still at `expected`.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if the record changed since it was loaded
    /// - `MemberNotFound` if the record disappeared
    /// - `DatabaseError` on persistence failure
    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, DomainError>;

    /// Ids of every member record, deleted ones included.
    async fn list_ids(&self) -> Result<Vec<MemberId>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn MemberRepository) {}

    #[test]
    fn record_source_displays_collection_name() {
        assert_eq!(RecordSource::Members.to_string(), "members");
        assert_eq!(RecordSource::Users.to_string(), "users");
    }
}
