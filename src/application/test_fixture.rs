//! Wiring shared by handler tests.

use chrono::NaiveDate;
use std::sync::Arc;

use super::{MemberRecordWriter, WritePolicy};
use crate::adapters::clock::FixedClock;
use crate::adapters::memory::{InMemoryEventBus, InMemoryMemberRepository, InMemoryPackageCatalog};
use crate::domain::foundation::{MemberId, Timestamp};
use crate::domain::ledger::test_support::package;
use crate::domain::membership::{Member, MembershipStatus};
use crate::ports::{Clock, EventPublisher, MemberRepository, PackageCatalog};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Harness {
    pub repo: InMemoryMemberRepository,
    pub catalog: InMemoryPackageCatalog,
    pub bus: InMemoryEventBus,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn on(today: NaiveDate) -> Self {
        Self {
            repo: InMemoryMemberRepository::new(),
            catalog: InMemoryPackageCatalog::new(),
            bus: InMemoryEventBus::new(),
            clock: Arc::new(FixedClock::on(today)),
        }
    }

    pub fn writer(&self) -> Arc<MemberRecordWriter> {
        Arc::new(MemberRecordWriter::new(self.repository(), WritePolicy::default()))
    }

    pub fn repository(&self) -> Arc<dyn MemberRepository> {
        Arc::new(self.repo.clone())
    }

    pub fn catalog(&self) -> Arc<dyn PackageCatalog> {
        Arc::new(self.catalog.clone())
    }

    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        Arc::new(self.bus.clone())
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Stores a member holding one package per `(start, expiry, total, remaining)`.
    pub async fn add_member(
        &self,
        id: &str,
        status: MembershipStatus,
        packages: &[(NaiveDate, NaiveDate, u32, u32)],
    ) -> MemberId {
        let member_id = MemberId::new(id).unwrap();
        let mut member = Member::new(
            member_id.clone(),
            id,
            status,
            Timestamp::start_of_day(date(2024, 12, 1)),
        );
        for &(start, expiry, total, remaining) in packages {
            member.packages.push(package(start, expiry, total, remaining));
        }
        member.recompute_aggregate();
        self.repo.insert(member).await;
        member_id
    }

    pub async fn member(&self, id: &MemberId) -> Member {
        self.repo.get(id).await.unwrap()
    }
}
