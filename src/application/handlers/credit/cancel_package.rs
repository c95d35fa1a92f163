//! CancelPackageHandler - voids one package.

use std::sync::Arc;
use tracing::info;

use crate::application::publishing::publish_events;
use crate::application::MemberRecordWriter;
use crate::domain::foundation::{MemberId, PackageId};
use crate::domain::ledger::Package;
use crate::domain::membership::{LedgerError, LedgerEvent};
use crate::ports::{Clock, EventPublisher};

#[derive(Debug, Clone)]
pub struct CancelPackageCommand {
    pub member_id: MemberId,
    pub package_id: PackageId,
    pub actor: String,
    pub reason: Option<String>,
}

pub struct CancelPackageHandler {
    writer: Arc<MemberRecordWriter>,
    clock: Arc<dyn Clock>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelPackageHandler {
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

    pub async fn handle(&self, cmd: CancelPackageCommand) -> Result<Package, LedgerError> {
        let now = self.clock.timestamp();
        let committed = self
            .writer
            .update(&cmd.member_id, |member| {
                member.cancel_package(&cmd.package_id, &cmd.actor, cmd.reason.clone(), now)
            })
            .await?;
        let package = committed.value;

        info!(
            member_id = %cmd.member_id,
            package_id = %package.id,
            actor = %cmd.actor,
            aggregate = committed.member.remaining_classes_aggregate,
            "Package cancelled"
        );

        let event = LedgerEvent::PackageCancelled {
            member_id: cmd.member_id.clone(),
            package_id: package.id,
            cancelled_by: cmd.actor.clone(),
            reason: package.cancellation.as_ref().and_then(|c| c.reason.clone()),
            occurred_at: now,
        };
        publish_events(self.event_publisher.as_ref(), vec![event], &cmd.actor).await;

        Ok(package)
    }
}
