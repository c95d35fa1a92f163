//! UnfreezeMemberHandler - ends a freeze and extends package expiries.

use std::sync::Arc;
use tracing::info;

use crate::application::publishing::publish_events;
use crate::application::MemberRecordWriter;
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::membership::{LedgerError, LedgerEvent, UnfreezeResult};
use crate::ports::{Clock, EventPublisher};

#[derive(Debug, Clone)]
pub struct UnfreezeMemberCommand {
    pub member_id: MemberId,
    pub actor: String,
    pub reason: Option<String>,
}

pub struct UnfreezeMemberHandler {
    writer: Arc<MemberRecordWriter>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl UnfreezeMemberHandler {
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

    pub async fn handle(&self, cmd: UnfreezeMemberCommand) -> Result<UnfreezeResult, LedgerError> {
        let today = self.clock.today();
        let now = self.clock.timestamp();

        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                member.unfreeze(&cmd.actor, cmd.reason.clone(), today, now)
            })
            .await?;
        let result = committed.value;

        info!(
            member_id = %cmd.member_id,
            actual_days = result.actual_frozen_days,
            extended = result.extended.len(),
            actor = %cmd.actor,
            "Member unfrozen"
        );

        let event = unfrozen_event(&cmd.member_id, &result, &cmd.actor, now);
        publish_events(self.event_publisher.as_ref(), vec![event], &cmd.actor).await;

        Ok(result)
    }
}

pub(crate) fn unfrozen_event(
    member_id: &MemberId,
    result: &UnfreezeResult,
    actor: &str,
    now: Timestamp,
) -> LedgerEvent {
    LedgerEvent::MemberUnfrozen {
        member_id: member_id.clone(),
        restored_status: result.restored_status,
        actual_frozen_days: result.actual_frozen_days,
        unfrozen_by: actor.to_string(),
        occurred_at: now,
    }
}
