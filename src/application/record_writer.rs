//! MemberRecordWriter - atomic read-modify-write of one member record.
//!
//! Every ledger mutation goes through `update`: load the record, apply a
//! synchronous mutation to a copy, and save it against the version that
//! was loaded. A concurrent write makes the save fail with a version
//! conflict; the writer then reloads and re-applies the mutation, up to
//! `max_attempts` times. Each store call is bounded by `record_timeout`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, MemberId};
use crate::domain::membership::{LedgerError, Member};
use crate::ports::{MemberRepository, RecordVersion, VersionedMember};

/// Retry and timeout bounds for record writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub max_attempts: u32,
    pub record_timeout: Duration,
    /// Pause before retry `n` is `n * retry_backoff`.
    pub retry_backoff: Duration,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            record_timeout: Duration::from_millis(2000),
            retry_backoff: Duration::from_millis(10),
        }
    }
}

/// Result of an update.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    /// Member as it now stands in the store.
    pub member: Member,
    /// Whatever the mutation returned.
    pub value: T,
    /// False when the mutation changed nothing and no write was issued.
    pub written: bool,
    pub attempts: u32,
}

pub struct MemberRecordWriter {
    repository: Arc<dyn MemberRepository>,
    policy: WritePolicy,
}

impl MemberRecordWriter {
    pub fn new(repository: Arc<dyn MemberRepository>, policy: WritePolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Loads a member, failing with `MemberNotFound` if no store has it.
    pub async fn read(&self, id: &MemberId) -> Result<VersionedMember, LedgerError> {
        self.bounded(self.repository.load(id))
            .await?
            .ok_or_else(|| LedgerError::member_not_found(id))
    }

    /// Ids of every member record.
    pub async fn list_ids(&self) -> Result<Vec<MemberId>, LedgerError> {
        self.bounded(self.repository.list_ids()).await
    }

    /// Applies `mutate` to the member atomically.
    ///
    /// Errors returned by `mutate` are final and nothing is written.
    /// Conflicts and timeouts are retried; when attempts run out the last
    /// retryable error is returned.
    ///
    /// A save that timed out may still have committed. Its copy is kept,
    /// and every later load is checked against it before the mutation is
    /// applied again, so one call never applies the mutation twice.
    pub async fn update<T, F>(&self, id: &MemberId, mut mutate: F) -> Result<Committed<T>, LedgerError>
    where
        F: FnMut(&mut Member) -> Result<T, LedgerError> + Send,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = LedgerError::PersistenceConflict {
            record: id.to_string(),
        };
        let mut unacknowledged: Vec<Unacknowledged<T>> = Vec::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.retry_backoff * (attempt - 1)).await;
            }

            let loaded = match self.read(id).await {
                Ok(loaded) => loaded,
                Err(e) if e.is_retryable() => {
                    warn!(member_id = %id, attempt, error = %e, "Member read failed, retrying");
                    last_error = e;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(landed) = take_landed(&mut unacknowledged, &loaded) {
                warn!(member_id = %id, attempt, "Timed-out write had committed");
                return Ok(Committed {
                    member: landed.member,
                    value: landed.value,
                    written: true,
                    attempts: attempt,
                });
            }

            let VersionedMember { member, version } = loaded;
            let mut working = member.clone();
            let value = mutate(&mut working)?;

            if working == member {
                debug!(member_id = %id, attempt, "Mutation changed nothing, skipping write");
                return Ok(Committed {
                    member: working,
                    value,
                    written: false,
                    attempts: attempt,
                });
            }

            match self.save(&working, version).await {
                Ok(_) => {
                    return Ok(Committed {
                        member: working,
                        value,
                        written: true,
                        attempts: attempt,
                    })
                }
                Err(e @ LedgerError::StoreTimeout { .. }) => {
                    warn!(member_id = %id, attempt, error = %e, "Member write unacknowledged, re-reading");
                    unacknowledged.push(Unacknowledged {
                        expected: version,
                        member: working,
                        value,
                    });
                    last_error = e;
                }
                Err(e) if e.is_retryable() => {
                    warn!(member_id = %id, attempt, error = %e, "Member write lost a race, retrying");
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        if !unacknowledged.is_empty() {
            if let Ok(loaded) = self.read(id).await {
                if let Some(landed) = take_landed(&mut unacknowledged, &loaded) {
                    return Ok(Committed {
                        member: landed.member,
                        value: landed.value,
                        written: true,
                        attempts: max_attempts,
                    });
                }
            }
        }

        Err(last_error)
    }

    async fn save(&self, member: &Member, expected: RecordVersion) -> Result<RecordVersion, LedgerError> {
        self.bounded(self.repository.save(member, expected)).await
    }

    async fn bounded<T, Fut>(&self, call: Fut) -> Result<T, LedgerError>
    where
        Fut: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.policy.record_timeout, call).await {
            Ok(result) => result.map_err(LedgerError::from),
            Err(_) => Err(LedgerError::StoreTimeout {
                timeout_ms: self.policy.record_timeout.as_millis() as u64,
            }),
        }
    }
}

/// A write whose save timed out before the store answered.
struct Unacknowledged<T> {
    expected: RecordVersion,
    member: Member,
    value: T,
}

/// Removes and returns the unacknowledged write the store now holds, if any.
fn take_landed<T>(unacknowledged: &mut Vec<Unacknowledged<T>>, loaded: &VersionedMember) -> Option<Unacknowledged<T>> {
    let index = unacknowledged.iter().position(|w| {
        w.expected.source == loaded.version.source
            && loaded.version.version > w.expected.version
            && w.member == loaded.member
    })?;
    Some(unacknowledged.swap_remove(index))
}
