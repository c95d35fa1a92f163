//! FreezeMemberHandler - suspends a member and stops package expiry clocks.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::application::publishing::publish_events;
use crate::application::MemberRecordWriter;
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::membership::{FreezeRecord, FreezeRequest, FreezeScope, LedgerError, LedgerEvent};
use crate::ports::{Clock, EventPublisher};

#[derive(Debug, Clone)]
pub struct FreezeMemberCommand {
    pub member_id: MemberId,
    pub reason: String,
    /// Must be strictly after today.
    pub planned_end: NaiveDate,
    pub actor: String,
    pub scope: FreezeScope,
}

pub struct FreezeMemberHandler {
    writer: Arc<MemberRecordWriter>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl FreezeMemberHandler {
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

    pub async fn handle(&self, cmd: FreezeMemberCommand) -> Result<FreezeRecord, LedgerError> {
        let today = self.clock.today();
        let now = self.clock.timestamp();
        let request = FreezeRequest {
            reason: cmd.reason,
            planned_end: cmd.planned_end,
            actor: cmd.actor,
            scope: cmd.scope,
        };

        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                member.freeze(request.clone(), today, now).cloned()
            })
            .await?;
        let record = committed.value;

        info!(
            member_id = %cmd.member_id,
            scope = %record.freeze_scope,
            planned_end = %record.freeze_end_date_planned,
            planned_days = record.planned_duration_days,
            actor = %record.frozen_by,
            "Member frozen"
        );

        let event = frozen_event(&cmd.member_id, &record, now);
        publish_events(self.event_publisher.as_ref(), vec![event], &record.frozen_by).await;

        Ok(record)
    }
}

pub(crate) fn frozen_event(member_id: &MemberId, record: &FreezeRecord, now: Timestamp) -> LedgerEvent {
    LedgerEvent::MemberFrozen {
        member_id: member_id.clone(),
        scope: record.freeze_scope,
        reason: record.reason.clone(),
        freeze_start_date: record.freeze_start_date,
        planned_end_date: record.freeze_end_date_planned,
        planned_duration_days: record.planned_duration_days,
        frozen_by: record.frozen_by.clone(),
        occurred_at: now,
    }
}
