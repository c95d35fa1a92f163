//! Property tests for the cached credit aggregate.
//!
//! Whatever sequence of ledger operations a member goes through, the cached
//! aggregate must equal the sum of remaining lessons over non-cancelled
//! packages, and no package may ever exceed its total.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use lesson_ledger::domain::foundation::{MemberId, Timestamp};
use lesson_ledger::domain::ledger::{PackageLedger, PackageType, RefundFallback, ResolvedTerms};
use lesson_ledger::domain::membership::{Member, MembershipStatus};

#[derive(Debug, Clone)]
enum Op {
    Deduct { day: i64 },
    Refund { day: i64, fallback: bool },
    Assign { start_day: i64, lessons: u32, months: u32 },
    Cancel { pick: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0i64..120).prop_map(|day| Op::Deduct { day }),
        3 => (0i64..120, any::<bool>()).prop_map(|(day, fallback)| Op::Refund { day, fallback }),
        2 => (0i64..90, 1u32..12, 1u32..4)
            .prop_map(|(start_day, lessons, months)| Op::Assign { start_day, lessons, months }),
        1 => (0usize..8).prop_map(|pick| Op::Cancel { pick }),
    ]
}

fn origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn apply(member: &mut Member, op: &Op, now: Timestamp) {
    // Rejections are expected; only the invariant matters.
    match op {
        Op::Deduct { day } => {
            let _ = member.deduct_credit(origin() + Duration::days(*day), "prop", now);
        }
        Op::Refund { day, fallback } => {
            let fallback = if *fallback {
                RefundFallback::MostRecentActive
            } else {
                RefundFallback::Disabled
            };
            let _ = member.refund_credit(origin() + Duration::days(*day), "prop", fallback, now);
        }
        Op::Assign {
            start_day,
            lessons,
            months,
        } => {
            let terms = ResolvedTerms {
                catalog_package_id: None,
                name: format!("{lessons} lessons"),
                package_type: PackageType::Group,
                total_lessons: *lessons,
                duration_months: *months,
            };
            let _ = member.assign_package(terms, origin() + Duration::days(*start_day), "prop", now);
        }
        Op::Cancel { pick } => {
            if member.packages.is_empty() {
                return;
            }
            let id = member.packages[pick % member.packages.len()].id;
            let _ = member.cancel_package(&id, "prop", None, now);
        }
    }
}

proptest! {
    #[test]
    fn aggregate_tracks_non_cancelled_remaining(ops in prop::collection::vec(op(), 1..60)) {
        let now = Timestamp::start_of_day(origin());
        let mut member = Member::new(
            MemberId::new("prop-member").unwrap(),
            "Prop",
            MembershipStatus::Active,
            now,
        );

        for op in &ops {
            apply(&mut member, op, now);

            let expected: u32 = member
                .packages
                .iter()
                .filter(|p| !p.is_cancelled())
                .map(|p| p.remaining_lessons)
                .sum();
            prop_assert_eq!(member.remaining_classes_aggregate, expected);
            prop_assert!(PackageLedger::is_consistent(&member.packages, member.remaining_classes_aggregate));
            for package in &member.packages {
                prop_assert!(package.remaining_lessons <= package.total_lessons);
            }
        }
    }

    #[test]
    fn deduct_then_refund_restores_every_package(
        lessons in 1u32..10,
        day in 0i64..30,
        spent in 0usize..5,
    ) {
        let now = Timestamp::start_of_day(origin());
        let mut member = Member::new(
            MemberId::new("prop-member").unwrap(),
            "Prop",
            MembershipStatus::Active,
            now,
        );
        let terms = ResolvedTerms {
            catalog_package_id: None,
            name: "Ten".to_string(),
            package_type: PackageType::Group,
            total_lessons: lessons,
            duration_months: 1,
        };
        member.assign_package(terms, origin(), "prop", now).unwrap();
        let date = origin() + Duration::days(day);
        for _ in 0..spent {
            let _ = member.deduct_credit(date, "earlier", now);
        }
        let before = member.clone();

        if member.deduct_credit(date, "round trip", now).is_ok() {
            member
                .refund_credit(date, "round trip", RefundFallback::MostRecentActive, now)
                .unwrap();
            prop_assert_eq!(member.remaining_classes_aggregate, before.remaining_classes_aggregate);
            prop_assert_eq!(member.packages[0].remaining_lessons, before.packages[0].remaining_lessons);
            prop_assert_eq!(member.packages[0].expiry_date, before.packages[0].expiry_date);
        } else {
            prop_assert_eq!(&member, &before);
        }
    }
}
