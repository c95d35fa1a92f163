//! CheckEligibilityHandler - "can this member book a lesson on that date?".

use chrono::NaiveDate;
use std::sync::Arc;

use crate::application::legacy::{legacy_catalog_entry, migrate_in_place};
use crate::application::MemberRecordWriter;
use crate::domain::foundation::MemberId;
use crate::domain::membership::{Eligibility, LedgerError};
use crate::ports::{Clock, PackageCatalog};

#[derive(Debug, Clone)]
pub struct CheckEligibilityCommand {
    pub member_id: MemberId,
    pub lesson_date: NaiveDate,
}

/// Read-only. Unmigrated legacy credits are evaluated as if migrated, but
/// nothing is written.
pub struct CheckEligibilityHandler {
    writer: Arc<MemberRecordWriter>,
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
}

impl CheckEligibilityHandler {
    pub fn new(
        writer: Arc<MemberRecordWriter>,
        catalog: Arc<dyn PackageCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            writer,
            catalog,
            clock,
        }
    }

    pub async fn handle(&self, cmd: CheckEligibilityCommand) -> Result<Eligibility, LedgerError> {
        let mut member = self.writer.read(&cmd.member_id).await?.member;
        let legacy_entry = legacy_catalog_entry(self.catalog.as_ref(), &member).await;
        migrate_in_place(&mut member, legacy_entry.as_ref(), self.clock.timestamp());
        Ok(member.eligibility(cmd.lesson_date))
    }
}
