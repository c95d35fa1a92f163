//! AutoReconciler - repairs drifted aggregates and ends lapsed freezes.
//!
//! Runs before bulk reads and on a timer. Errors never reach the caller
//! of the read it runs in front of; they are logged and returned in the
//! report instead.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::batch::MemberFailure;
use crate::application::handlers::freeze::unfrozen_event;
use crate::application::publishing::{new_run_id, publish_run_events};
use crate::application::MemberRecordWriter;
use crate::domain::ledger::LegacyMigrator;
use crate::domain::membership::{LedgerError, LedgerEvent, UnfreezeResult};
use crate::ports::{Clock, EventPublisher};

/// Reason recorded in freeze history for automatic unfreezes.
pub const AUTO_UNFREEZE_REASON: &str = "Planned freeze end reached";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub aggregates_corrected: usize,
    pub auto_unfrozen: usize,
    pub errors: Vec<MemberFailure>,
}

#[derive(Default)]
struct Repair {
    /// `(stale, fresh)` when the cached aggregate had drifted.
    corrected: Option<(u32, u32)>,
    unfrozen: Option<UnfreezeResult>,
}

pub struct AutoReconciler {
    writer: Arc<MemberRecordWriter>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
    system_actor: String,
}

impl AutoReconciler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        clock: Arc<dyn Clock>,
        event_publisher: Arc<dyn EventPublisher>,
        system_actor: impl Into<String>,
    ) -> Self {
        Self {
            writer,
            clock,
            event_publisher,
            system_actor: system_actor.into(),
        }
    }

    /// One pass over every member.
    ///
    /// Fails only if the member list itself cannot be read.
    pub async fn run(&self) -> Result<ReconcileReport, LedgerError> {
        let today = self.clock.today();
        let now = self.clock.timestamp();
        let run_id = new_run_id();
        let mut report = ReconcileReport::default();

        for member_id in self.writer.list_ids().await? {
            report.scanned += 1;
            let repaired = self
                .writer
                .update(&member_id, |member| {
                    let mut repair = Repair::default();
                    if member.deleted {
                        return Ok(repair);
                    }
                    // Unmigrated legacy members have no authoritative ledger yet.
                    if !LegacyMigrator::needs_migration(member) {
                        repair.corrected = member
                            .recompute_aggregate()
                            .map(|stale| (stale, member.remaining_classes_aggregate));
                    }
                    if member.freeze_lapsed(today) {
                        repair.unfrozen = Some(member.unfreeze(
                            &self.system_actor,
                            Some(AUTO_UNFREEZE_REASON.to_string()),
                            today,
                            now,
                        )?);
                    }
                    Ok(repair)
                })
                .await;

            let repair = match repaired {
                Ok(committed) => committed.value,
                Err(error) => {
                    warn!(member_id = %member_id, error = %error, "Reconciliation failed for member");
                    report.errors.push(MemberFailure { member_id, error });
                    continue;
                }
            };

            let mut events = Vec::new();
            if let Some((previous, corrected)) = repair.corrected {
                report.aggregates_corrected += 1;
                info!(member_id = %member_id, previous, corrected, "Aggregate drift corrected");
                events.push(LedgerEvent::AggregateCorrected {
                    member_id: member_id.clone(),
                    previous,
                    corrected,
                    occurred_at: now,
                });
            }
            if let Some(unfrozen) = repair.unfrozen {
                report.auto_unfrozen += 1;
                info!(
                    member_id = %member_id,
                    actual_days = unfrozen.actual_frozen_days,
                    "Lapsed freeze ended automatically"
                );
                events.push(unfrozen_event(&member_id, &unfrozen, &self.system_actor, now));
            }
            publish_run_events(self.event_publisher.as_ref(), events, &self.system_actor, &run_id).await;
        }

        debug!(
            run_id = %run_id,
            scanned = report.scanned,
            corrected = report.aggregates_corrected,
            unfrozen = report.auto_unfrozen,
            errors = report.errors.len(),
            "Reconciliation pass finished"
        );
        Ok(report)
    }
}
