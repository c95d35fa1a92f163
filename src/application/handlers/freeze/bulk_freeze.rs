//! BulkFreezeCoordinator - group freeze and unfreeze across all members.
//!
//! Members are processed one at a time, each in its own atomic update.
//! Classification (change, already in state, skip) happens inside that
//! update so it always sees the record it is about to write. A failure on
//! one member is recorded and the batch moves on.
//!
//! | Member | freeze_all | unfreeze_all |
//! |--------|------------|--------------|
//! | deleted | ignored | ignored |
//! | active | freeze | already in state |
//! | frozen, group scope | already in state | unfreeze |
//! | frozen, individual scope | skipped | skipped |
//! | pending, cancelled, rejected | skipped | skipped |

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use super::freeze_member::frozen_event;
use super::unfreeze_member::unfrozen_event;
use crate::application::batch::{BatchOutcome, MemberFailure};
use crate::application::publishing::{new_run_id, publish_run_events};
use crate::application::MemberRecordWriter;
use crate::domain::ledger::ExpiryClock;
use crate::domain::membership::{FreezeRequest, FreezeScope, LedgerError, Member, MembershipStatus};
use crate::ports::{Clock, EventPublisher};

#[derive(Debug, Clone)]
pub struct FreezeAllCommand {
    pub reason: String,
    pub planned_end: NaiveDate,
    pub actor: String,
}

#[derive(Debug, Clone)]
pub struct UnfreezeAllCommand {
    pub actor: String,
    pub reason: Option<String>,
}

/// Tally of a bulk freeze or unfreeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub outcome: BatchOutcome,
    /// Members frozen (freeze_all) or unfrozen (unfreeze_all).
    pub changed_count: usize,
    pub already_in_state_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<MemberFailure>,
}

impl BatchResult {
    fn empty() -> Self {
        Self {
            outcome: BatchOutcome::NoOp,
            changed_count: 0,
            already_in_state_count: 0,
            skipped_count: 0,
            errors: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.outcome = BatchOutcome::from_counts(self.changed_count, self.errors.len());
        self
    }
}

/// What the batch decided for one member.
enum Step<T> {
    Changed(T),
    AlreadyInState,
    Skipped,
    Ignored,
}

pub struct BulkFreezeCoordinator {
    writer: Arc<MemberRecordWriter>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl BulkFreezeCoordinator {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            writer,
            clock,
            event_publisher,
        }
    }

    /// Group-freezes every active member.
    ///
    /// The request itself is validated before any member is touched; an
    /// invalid reason or window fails the whole call.
    pub async fn freeze_all(&self, cmd: FreezeAllCommand) -> Result<BatchResult, LedgerError> {
        let today = self.clock.today();
        let now = self.clock.timestamp();
        if cmd.reason.trim().is_empty() {
            return Err(LedgerError::validation("reason", "Freeze reason is required"));
        }
        if cmd.actor.trim().is_empty() {
            return Err(LedgerError::validation("actor", "Actor is required"));
        }
        if !ExpiryClock::is_valid_window(today, cmd.planned_end) {
            return Err(LedgerError::InvalidFreezeWindow {
                today,
                planned_end: cmd.planned_end,
            });
        }

        let request = FreezeRequest {
            reason: cmd.reason,
            planned_end: cmd.planned_end,
            actor: cmd.actor,
            scope: FreezeScope::Group,
        };

        let run_id = new_run_id();
        let mut result = BatchResult::empty();
        for member_id in self.writer.list_ids().await? {
            let step = self
                .writer
                .update(&member_id, |member| match classify_for_freeze(member) {
                    Step::Changed(()) => member
                        .freeze(request.clone(), today, now)
                        .map(|record| Step::Changed(record.clone())),
                    Step::AlreadyInState => Ok(Step::AlreadyInState),
                    Step::Skipped => Ok(Step::Skipped),
                    Step::Ignored => Ok(Step::Ignored),
                })
                .await;

            match step {
                Ok(committed) => match committed.value {
                    Step::Changed(record) => {
                        result.changed_count += 1;
                        let event = frozen_event(&member_id, &record, now);
                        publish_run_events(
                            self.event_publisher.as_ref(),
                            vec![event],
                            &request.actor,
                            &run_id,
                        )
                        .await;
                    }
                    Step::AlreadyInState => result.already_in_state_count += 1,
                    Step::Skipped => result.skipped_count += 1,
                    Step::Ignored => {}
                },
                Err(error) => {
                    warn!(member_id = %member_id, error = %error, "Group freeze failed for member");
                    result.errors.push(MemberFailure { member_id, error });
                }
            }
        }

        let result = result.finish();
        info!(
            run_id = %run_id,
            outcome = ?result.outcome,
            frozen = result.changed_count,
            already_frozen = result.already_in_state_count,
            skipped = result.skipped_count,
            errors = result.errors.len(),
            "Group freeze finished"
        );
        Ok(result)
    }

    /// Lifts every group freeze. Individually frozen members stay frozen.
    pub async fn unfreeze_all(&self, cmd: UnfreezeAllCommand) -> Result<BatchResult, LedgerError> {
        let today = self.clock.today();
        let now = self.clock.timestamp();
        if cmd.actor.trim().is_empty() {
            return Err(LedgerError::validation("actor", "Actor is required"));
        }

        let run_id = new_run_id();
        let mut result = BatchResult::empty();
        for member_id in self.writer.list_ids().await? {
            let step = self
                .writer
                .update(&member_id, |member| match classify_for_unfreeze(member) {
                    Step::Changed(()) => member
                        .unfreeze(&cmd.actor, cmd.reason.clone(), today, now)
                        .map(Step::Changed),
                    Step::AlreadyInState => Ok(Step::AlreadyInState),
                    Step::Skipped => Ok(Step::Skipped),
                    Step::Ignored => Ok(Step::Ignored),
                })
                .await;

            match step {
                Ok(committed) => match committed.value {
                    Step::Changed(unfrozen) => {
                        result.changed_count += 1;
                        let event = unfrozen_event(&member_id, &unfrozen, &cmd.actor, now);
                        publish_run_events(self.event_publisher.as_ref(), vec![event], &cmd.actor, &run_id)
                            .await;
                    }
                    Step::AlreadyInState => result.already_in_state_count += 1,
                    Step::Skipped => result.skipped_count += 1,
                    Step::Ignored => {}
                },
                Err(error) => {
                    warn!(member_id = %member_id, error = %error, "Group unfreeze failed for member");
                    result.errors.push(MemberFailure { member_id, error });
                }
            }
        }

        let result = result.finish();
        info!(
            run_id = %run_id,
            outcome = ?result.outcome,
            unfrozen = result.changed_count,
            already_active = result.already_in_state_count,
            skipped = result.skipped_count,
            errors = result.errors.len(),
            "Group unfreeze finished"
        );
        Ok(result)
    }
}

fn frozen_scope(member: &Member) -> Option<FreezeScope> {
    member.freeze.as_ref().map(|f| f.freeze_scope)
}

fn classify_for_freeze(member: &Member) -> Step<()> {
    if member.deleted {
        return Step::Ignored;
    }
    match member.membership_status {
        MembershipStatus::Active => Step::Changed(()),
        MembershipStatus::Frozen if frozen_scope(member) == Some(FreezeScope::Group) => {
            Step::AlreadyInState
        }
        _ => Step::Skipped,
    }
}

fn classify_for_unfreeze(member: &Member) -> Step<()> {
    if member.deleted {
        return Step::Ignored;
    }
    match member.membership_status {
        MembershipStatus::Active => Step::AlreadyInState,
        MembershipStatus::Frozen if frozen_scope(member) == Some(FreezeScope::Group) => {
            Step::Changed(())
        }
        _ => Step::Skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::freeze::{FreezeMemberCommand, FreezeMemberHandler};
    use crate::application::test_fixture::{date, Harness};
    use crate::domain::foundation::MemberId;

    fn freeze_all_cmd() -> FreezeAllCommand {
        FreezeAllCommand {
            reason: "Studio renovation".to_string(),
            planned_end: date(2025, 1, 20),
            actor: "owner".to_string(),
        }
    }

    async fn freeze_individually(h: &Harness, id: &MemberId) {
        FreezeMemberHandler::new(h.writer(), h.clock(), h.publisher())
            .handle(FreezeMemberCommand {
                member_id: id.clone(),
                reason: "Injury".to_string(),
                planned_end: date(2025, 2, 1),
                actor: "admin".to_string(),
                scope: FreezeScope::Individual,
            })
            .await
            .unwrap();
    }

    fn coordinator(h: &Harness) -> BulkFreezeCoordinator {
        BulkFreezeCoordinator::new(h.writer(), h.clock(), h.publisher())
    }

    #[tokio::test]
    async fn group_freeze_only_touches_active_members() {
        let h = Harness::on(date(2025, 1, 10));
        let x = h.add_member("x", MembershipStatus::Active, &[]).await;
        let y = h.add_member("y", MembershipStatus::Active, &[]).await;
        freeze_individually(&h, &y).await;
        let z = h.add_member("z", MembershipStatus::Cancelled, &[]).await;

        let result = coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();

        assert_eq!(result.changed_count, 1);
        assert_eq!(result.skipped_count, 2);
        assert!(result.errors.is_empty());
        assert_eq!(result.outcome, BatchOutcome::Success);
        assert_eq!(h.member(&x).await.membership_status, MembershipStatus::Frozen);
        let y = h.member(&y).await;
        assert_eq!(y.freeze.unwrap().freeze_scope, FreezeScope::Individual);
        assert_eq!(h.member(&z).await.membership_status, MembershipStatus::Cancelled);
    }

    #[tokio::test]
    async fn one_group_freeze_shares_a_correlation_id() {
        let h = Harness::on(date(2025, 1, 10));
        h.add_member("x", MembershipStatus::Active, &[]).await;
        h.add_member("y", MembershipStatus::Active, &[]).await;

        coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();
        coordinator(&h).unfreeze_all(UnfreezeAllCommand {
            actor: "owner".to_string(),
            reason: None,
        })
        .await
        .unwrap();

        let frozen = h.bus.events_of_type("member.frozen.v1").await;
        let unfrozen = h.bus.events_of_type("member.unfrozen.v1").await;
        assert_eq!(frozen.len(), 2);
        assert_eq!(unfrozen.len(), 2);
        let freeze_run = frozen[0].metadata.correlation_id.clone();
        assert!(freeze_run.is_some());
        assert_eq!(frozen[1].metadata.correlation_id, freeze_run);
        assert_eq!(unfrozen[0].metadata.correlation_id, unfrozen[1].metadata.correlation_id);
        assert_ne!(unfrozen[0].metadata.correlation_id, freeze_run);
    }

    #[tokio::test]
    async fn second_group_freeze_counts_already_frozen() {
        let h = Harness::on(date(2025, 1, 10));
        h.add_member("x", MembershipStatus::Active, &[]).await;

        coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();
        let again = coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();

        assert_eq!(again.changed_count, 0);
        assert_eq!(again.already_in_state_count, 1);
        assert_eq!(again.outcome, BatchOutcome::NoOp);
    }

    #[tokio::test]
    async fn deleted_members_are_not_counted() {
        let h = Harness::on(date(2025, 1, 10));
        let gone = h.add_member("gone", MembershipStatus::Active, &[]).await;
        let mut member = h.member(&gone).await;
        member.deleted = true;
        h.repo.insert(member).await;

        let result = coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();

        assert_eq!(result.changed_count + result.skipped_count + result.already_in_state_count, 0);
        assert_eq!(h.member(&gone).await.membership_status, MembershipStatus::Active);
    }

    #[tokio::test]
    async fn invalid_window_fails_before_touching_members() {
        let h = Harness::on(date(2025, 1, 10));
        h.add_member("x", MembershipStatus::Active, &[]).await;
        let mut cmd = freeze_all_cmd();
        cmd.planned_end = date(2025, 1, 9);

        let err = coordinator(&h).freeze_all(cmd).await.unwrap_err();

        assert!(matches!(err, LedgerError::InvalidFreezeWindow { .. }));
        assert_eq!(h.repo.save_count(), 0);
    }

    #[tokio::test]
    async fn group_unfreeze_leaves_individual_freezes() {
        let h = Harness::on(date(2025, 1, 10));
        let x = h.add_member("x", MembershipStatus::Active, &[]).await;
        let y = h.add_member("y", MembershipStatus::Active, &[]).await;
        freeze_individually(&h, &y).await;
        coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();
        h.add_member("w", MembershipStatus::Active, &[]).await;

        h.clock.set_date(date(2025, 1, 15));
        let result = coordinator(&h)
            .unfreeze_all(UnfreezeAllCommand {
                actor: "owner".to_string(),
                reason: Some("Renovation done early".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.changed_count, 1);
        assert_eq!(result.already_in_state_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(h.member(&x).await.membership_status, MembershipStatus::Active);
        assert_eq!(h.member(&y).await.membership_status, MembershipStatus::Frozen);
    }

    #[tokio::test]
    async fn per_member_failures_do_not_stop_the_batch() {
        let h = Harness::on(date(2025, 1, 10));
        h.add_member("a", MembershipStatus::Active, &[]).await;
        h.add_member("b", MembershipStatus::Active, &[]).await;
        // Every save for the first member loses the race until attempts run out.
        h.repo.inject_conflicts(5);

        let result = coordinator(&h).freeze_all(freeze_all_cmd()).await.unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].member_id.as_str(), "a");
        assert!(matches!(result.errors[0].error, LedgerError::PersistenceConflict { .. }));
        assert_eq!(result.changed_count, 1);
        assert_eq!(result.outcome, BatchOutcome::Partial);
    }
}
