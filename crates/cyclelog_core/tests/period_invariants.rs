//! Property-based tests for period history invariants.
//!
//! Arbitrary sequences of create/end/update/delete must keep every owner's
//! history free of overlaps, with at most one open period and unique starts.
//! Rejected operations must fail with a validation error and change nothing.

use chrono::{Days, NaiveDate};
use cyclelog_core::{
    Clock, CoreConfig, ManualClock, Owner, Period, PeriodService, PeriodServiceError,
    SqlitePeriodStore,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Day offsets are drawn from one year starting here; "today" is after it.
const HORIZON_DAYS: u64 = 360;

#[derive(Debug, Clone)]
enum Op {
    Create {
        start: u64,
    },
    End {
        pick: usize,
        end: u64,
    },
    Update {
        pick: usize,
        start: u64,
        length: Option<u64>,
    },
    Delete {
        pick: usize,
    },
}

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(offset)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..HORIZON_DAYS).prop_map(|start| Op::Create { start }),
        3 => (any::<usize>(), 0..HORIZON_DAYS).prop_map(|(pick, end)| Op::End { pick, end }),
        2 => (any::<usize>(), 0..HORIZON_DAYS, proptest::option::of(0..10_u64))
            .prop_map(|(pick, start, length)| Op::Update { pick, start, length }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn service() -> PeriodService<SqlitePeriodStore> {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(day(HORIZON_DAYS + 30)));
    PeriodService::with_config(
        SqlitePeriodStore::open_in_memory().unwrap(),
        CoreConfig::default(),
        clock,
    )
}

fn is_validation_error(err: &PeriodServiceError) -> bool {
    matches!(
        err,
        PeriodServiceError::OpenPeriodExists { .. }
            | PeriodServiceError::Overlap { .. }
            | PeriodServiceError::InvalidRange { .. }
            | PeriodServiceError::AlreadyEnded { .. }
    )
}

fn assert_history_consistent(history: &[Period]) {
    let open = history.iter().filter(|p| p.is_open()).count();
    assert!(open <= 1, "{open} open periods: {history:?}");

    let starts: HashSet<NaiveDate> = history.iter().map(|p| p.start_date).collect();
    assert_eq!(starts.len(), history.len(), "duplicate start: {history:?}");

    for period in history {
        if let Some(end) = period.end_date {
            assert!(end >= period.start_date, "inverted range: {period:?}");
        }
    }

    for (i, a) in history.iter().enumerate() {
        for b in &history[i + 1..] {
            let a_end = a.end_date.unwrap_or(NaiveDate::MAX);
            let b_end = b.end_date.unwrap_or(NaiveDate::MAX);
            assert!(
                a_end < b.start_date || b_end < a.start_date,
                "overlap between {a:?} and {b:?}"
            );
        }
    }

    let mut sorted = history.to_vec();
    sorted.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    assert_eq!(sorted, history, "list is not newest first");
}

/// Applies one operation and checks its visible effect.
fn apply(service: &PeriodService<SqlitePeriodStore>, before: &[Period], op: &Op) {
    let target = |pick: usize| before[pick % before.len()].clone();

    let outcome = match *op {
        Op::Create { start } => {
            if before.is_empty() {
                let created = service.create(Owner::User, day(start)).unwrap();
                assert!(created.is_open());
                return;
            }
            service.create(Owner::User, day(start)).map(|created| {
                assert_eq!(created.start_date, day(start));
                assert!(created.is_open());
            })
        }
        Op::End { pick, end } if !before.is_empty() => {
            let period = target(pick);
            service
                .end(Owner::User, period.id, day(end))
                .map(|ended| assert_eq!(ended.end_date, Some(day(end))))
        }
        Op::Update {
            pick,
            start,
            length,
        } if !before.is_empty() => {
            let period = target(pick);
            let end = length.map(|length| day(start + length));
            service
                .update(Owner::User, period.id, day(start), end)
                .map(|updated| {
                    assert_eq!(updated.start_date, day(start));
                    assert_eq!(updated.end_date, end);
                })
        }
        Op::Delete { pick } if !before.is_empty() => {
            let period = target(pick);
            service.delete(Owner::User, period.id).map(|()| {
                let after = service.list(Owner::User).unwrap();
                assert!(after.iter().all(|p| p.id != period.id));
            })
        }
        _ => return,
    };

    if let Err(err) = outcome {
        assert!(is_validation_error(&err), "unexpected error for {op:?}: {err}");
        assert_eq!(
            service.list(Owner::User).unwrap(),
            before,
            "rejected {op:?} changed history"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operation_sequences_preserve_history_invariants(
        ops in proptest::collection::vec(arb_op(), 1..60)
    ) {
        let service = service();
        let demo_before = service.list(Owner::Demo).unwrap();

        for op in &ops {
            let before = service.list(Owner::User).unwrap();
            apply(&service, &before, op);
            assert_history_consistent(&service.list(Owner::User).unwrap());
        }

        // The demo collection is never touched by user operations.
        prop_assert_eq!(service.list(Owner::Demo).unwrap(), demo_before);
    }

    #[test]
    fn closed_periods_a_cycle_apart_are_always_accepted(
        starts in proptest::collection::btree_set(0..HORIZON_DAYS / 30, 1..12),
        length in 1..10_u64,
    ) {
        let service = service();
        for slot in &starts {
            let start = day(slot * 30);
            let created = service.create(Owner::User, start).unwrap();
            service
                .end(Owner::User, created.id, start + Days::new(length - 1))
                .unwrap();
        }

        let history = service.list(Owner::User).unwrap();
        prop_assert_eq!(history.len(), starts.len());
        assert_history_consistent(&history);

        let stats = service.stats(Owner::User).unwrap();
        prop_assert_eq!(stats.average_period_length, Some(length as f64));
        prop_assert!(stats.current_period.is_none());
    }
}
