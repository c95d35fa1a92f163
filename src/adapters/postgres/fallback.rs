//! Member store spanning both record shapes.
//!
//! `load` asks the primary store first and the secondary only on a miss.
//! The returned version names the store that answered, and `save` routes
//! the write back to that same store.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, MemberId};
use crate::domain::membership::Member;
use crate::ports::{MemberRepository, RecordSource, RecordVersion, VersionedMember};

pub struct FallbackMemberRepository {
    primary: Arc<dyn MemberRepository>,
    primary_source: RecordSource,
    secondary: Arc<dyn MemberRepository>,
}

impl FallbackMemberRepository {
    /// `primary_source` is the shape `primary` stores; the other shape is
    /// routed to `secondary`.
    pub fn new(
        primary: Arc<dyn MemberRepository>,
        primary_source: RecordSource,
        secondary: Arc<dyn MemberRepository>,
    ) -> Self {
        Self {
            primary,
            primary_source,
            secondary,
        }
    }

    fn store_for(&self, source: RecordSource) -> &Arc<dyn MemberRepository> {
        if source == self.primary_source {
            &self.primary
        } else {
            &self.secondary
        }
    }
}

#[async_trait]
impl MemberRepository for FallbackMemberRepository {
    async fn load(&self, id: &MemberId) -> Result<Option<VersionedMember>, DomainError> {
        if let Some(found) = self.primary.load(id).await? {
            return Ok(Some(found));
        }
        self.secondary.load(id).await
    }

    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, DomainError> {
        self.store_for(expected.source).save(member, expected).await
    }

    async fn list_ids(&self) -> Result<Vec<MemberId>, DomainError> {
        let mut ids: BTreeSet<MemberId> = self.primary.list_ids().await?.into_iter().collect();
        ids.extend(self.secondary.list_ids().await?);
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMemberRepository;
    use crate::domain::foundation::Timestamp;
    use crate::domain::membership::MembershipStatus;

    fn member(id: &str) -> Member {
        Member::new(
            MemberId::new(id).unwrap(),
            id,
            MembershipStatus::Active,
            Timestamp::now(),
        )
    }

    fn stores() -> (InMemoryMemberRepository, InMemoryMemberRepository, FallbackMemberRepository) {
        let members = InMemoryMemberRepository::with_source(RecordSource::Members);
        let users = InMemoryMemberRepository::with_source(RecordSource::Users);
        let fallback = FallbackMemberRepository::new(
            Arc::new(members.clone()),
            RecordSource::Members,
            Arc::new(users.clone()),
        );
        (members, users, fallback)
    }

    #[tokio::test]
    async fn falls_back_to_user_directory() {
        let (_members, users, repo) = stores();
        users.insert(member("u-1")).await;

        let loaded = repo.load(&MemberId::new("u-1").unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.version.source, RecordSource::Users);
    }

    #[tokio::test]
    async fn save_goes_back_to_the_store_that_loaded() {
        let (members, users, repo) = stores();
        users.insert(member("u-1")).await;

        let mut loaded = repo.load(&MemberId::new("u-1").unwrap()).await.unwrap().unwrap();
        loaded.member.display_name = "Renamed".to_string();
        repo.save(&loaded.member, loaded.version).await.unwrap();

        assert_eq!(users.save_count(), 1);
        assert_eq!(members.save_count(), 0);
        assert!(members.get(&loaded.member.id).await.is_none());
    }

    #[tokio::test]
    async fn primary_wins_when_both_hold_the_id() {
        let (members, users, repo) = stores();
        members.insert(member("dup")).await;
        users.insert(member("dup")).await;

        let loaded = repo.load(&MemberId::new("dup").unwrap()).await.unwrap().unwrap();
        assert_eq!(loaded.version.source, RecordSource::Members);
        assert_eq!(repo.list_ids().await.unwrap().len(), 1);
    }
}
