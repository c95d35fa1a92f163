//! In-memory member store with compare-and-swap writes.
//!
//! Mirrors the versioning contract of the PostgreSQL adapters. Tests can
//! inject version conflicts (as if another writer got in first), slow
//! saves, and saves that commit but acknowledge late.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MemberId};
use crate::domain::membership::Member;
use crate::ports::{MemberRepository, RecordSource, RecordVersion, VersionedMember};

#[derive(Debug, Clone)]
struct StoredMember {
    member: Member,
    version: u64,
}

#[derive(Debug, Clone)]
pub struct InMemoryMemberRepository {
    source: RecordSource,
    records: Arc<RwLock<HashMap<MemberId, StoredMember>>>,
    pending_conflicts: Arc<AtomicUsize>,
    save_delay_ms: Arc<AtomicU64>,
    ack_delay_ms: Arc<AtomicU64>,
    save_count: Arc<AtomicUsize>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::with_source(RecordSource::Members)
    }

    /// Store that reports `source` on every record it returns.
    pub fn with_source(source: RecordSource) -> Self {
        Self {
            source,
            records: Arc::new(RwLock::new(HashMap::new())),
            pending_conflicts: Arc::new(AtomicUsize::new(0)),
            save_delay_ms: Arc::new(AtomicU64::new(0)),
            ack_delay_ms: Arc::new(AtomicU64::new(0)),
            save_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Inserts or replaces a record, bumping its version.
    pub async fn insert(&self, member: Member) {
        let mut records = self.records.write().await;
        let version = records.get(&member.id).map_or(1, |s| s.version + 1);
        records.insert(member.id.clone(), StoredMember { member, version });
    }

    /// Current stored copy, bypassing versioning.
    pub async fn get(&self, id: &MemberId) -> Option<Member> {
        self.records.read().await.get(id).map(|s| s.member.clone())
    }

    pub async fn version_of(&self, id: &MemberId) -> Option<u64> {
        self.records.read().await.get(id).map(|s| s.version)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Makes the next `n` saves lose the race to a concurrent writer.
    pub fn inject_conflicts(&self, n: usize) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    /// Delays every save by `delay`.
    pub fn set_save_delay(&self, delay: Duration) {
        self.save_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delays the reply of every save by `delay` after it has committed.
    pub fn set_ack_delay(&self, delay: Duration) {
        self.ack_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    fn take_injected_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryMemberRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn load(&self, id: &MemberId) -> Result<Option<VersionedMember>, DomainError> {
        let records = self.records.read().await;
        Ok(records.get(id).map(|stored| VersionedMember {
            member: stored.member.clone(),
            version: RecordVersion {
                source: self.source,
                version: stored.version,
            },
        }))
    }

    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, DomainError> {
        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let committed = {
            let mut records = self.records.write().await;
            let stored = records.get_mut(&member.id).ok_or_else(|| {
                DomainError::new(ErrorCode::MemberNotFound, "Member record not found")
                    .with_detail("member_id", member.id.as_str())
            })?;

            if self.take_injected_conflict() {
                stored.version += 1;
            }
            if stored.version != expected.version {
                return Err(DomainError::version_conflict(
                    member.id.as_str(),
                    expected.version,
                    stored.version,
                ));
            }

            stored.member = member.clone();
            stored.version += 1;
            self.save_count.fetch_add(1, Ordering::SeqCst);
            stored.version
        };

        let ack_delay = self.ack_delay_ms.load(Ordering::SeqCst);
        if ack_delay > 0 {
            tokio::time::sleep(Duration::from_millis(ack_delay)).await;
        }

        Ok(RecordVersion {
            source: self.source,
            version: committed,
        })
    }

    async fn list_ids(&self) -> Result<Vec<MemberId>, DomainError> {
        let mut ids: Vec<MemberId> = self.records.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
