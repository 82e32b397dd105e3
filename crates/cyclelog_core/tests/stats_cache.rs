use chrono::NaiveDate;
use cyclelog_core::db::open_db;
use cyclelog_core::{
    Clock, CoreConfig, ManualClock, Owner, PeriodService, PeriodServiceError, PeriodStats,
    SqlitePeriodStore,
};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

struct Fixture {
    clock: Arc<ManualClock>,
    service: PeriodService<SqlitePeriodStore>,
    /// Second connection that writes behind the service's back.
    raw: Connection,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cyclelog.db");
    let clock = Arc::new(ManualClock::new(date("2025-06-01")));
    let shared: Arc<dyn Clock> = clock.clone();
    let service = PeriodService::with_config(
        SqlitePeriodStore::open(&path).unwrap(),
        CoreConfig::default(),
        shared,
    );
    let raw = open_raw(&path);
    Fixture {
        clock,
        service,
        raw,
        _dir: dir,
    }
}

fn open_raw(path: &Path) -> Connection {
    open_db(path).unwrap()
}

fn raw_insert(conn: &Connection, table: &str, start: &str, end: Option<&str>) -> i64 {
    conn.execute(
        &format!("INSERT INTO {table} (start_date, end_date) VALUES (?1, ?2);"),
        params![start, end],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[test]
fn stats_are_served_from_cache_within_ttl() {
    let fx = fixture();
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());

    raw_insert(&fx.raw, "periods", "2025-01-01", None);
    fx.clock.advance(Duration::from_secs(29));
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());
}

#[test]
fn stats_are_recomputed_after_ttl() {
    let fx = fixture();
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());

    raw_insert(&fx.raw, "periods", "2025-01-01", None);
    fx.clock.advance(Duration::from_secs(30));

    let stats = fx.service.stats(Owner::User).unwrap();
    assert_eq!(
        stats.current_period.map(|p| p.start_date),
        Some(date("2025-01-01"))
    );
}

#[test]
fn successful_mutation_invalidates_immediately() {
    let fx = fixture();
    assert!(fx.service.stats(Owner::User).unwrap().current_period.is_none());

    let created = fx.service.create(Owner::User, date("2025-01-01")).unwrap();
    let stats = fx.service.stats(Owner::User).unwrap();
    assert_eq!(stats.current_period.as_ref().map(|p| p.id), Some(created.id));

    fx.service
        .end(Owner::User, created.id, date("2025-01-05"))
        .unwrap();
    let stats = fx.service.stats(Owner::User).unwrap();
    assert!(stats.current_period.is_none());
    assert_eq!(stats.average_period_length, Some(5.0));

    fx.service.delete(Owner::User, created.id).unwrap();
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());
}

#[test]
fn failed_mutation_keeps_cached_entry() {
    let fx = fixture();
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());

    let raw_id = raw_insert(&fx.raw, "periods", "2025-01-01", None);
    let err = fx
        .service
        .create(Owner::User, date("2025-02-01"))
        .unwrap_err();
    assert!(matches!(err, PeriodServiceError::OpenPeriodExists { open_id } if open_id == raw_id));

    // The stale entry survives because nothing was committed.
    assert_eq!(fx.service.stats(Owner::User).unwrap(), PeriodStats::default());

    fx.service
        .end(Owner::User, raw_id, date("2025-01-05"))
        .unwrap();
    assert_eq!(
        fx.service.stats(Owner::User).unwrap().average_period_length,
        Some(5.0)
    );
}

#[test]
fn owners_have_independent_entries() {
    let fx = fixture();
    let demo_before = fx.service.stats(Owner::Demo).unwrap();
    assert!(demo_before.current_period.is_some());
    fx.service.stats(Owner::User).unwrap();

    // Change demo behind the cache, then mutate user through the service.
    fx.raw
        .execute(
            "UPDATE demo_periods SET end_date = '2026-02-06' WHERE end_date IS NULL;",
            [],
        )
        .unwrap();
    fx.service.create(Owner::User, date("2025-05-01")).unwrap();

    assert!(fx.service.stats(Owner::User).unwrap().current_period.is_some());
    assert_eq!(fx.service.stats(Owner::Demo).unwrap(), demo_before);

    fx.clock.advance(Duration::from_secs(31));
    assert!(fx.service.stats(Owner::Demo).unwrap().current_period.is_none());
}

#[test]
fn concurrent_readers_never_keep_stale_stats_after_writes() {
    let fx = fixture();
    let starts = ["2024-07-01", "2024-07-29", "2024-08-26", "2024-09-23", "2024-10-21"];

    thread::scope(|scope| {
        scope.spawn(|| {
            for start in starts {
                let start_date = date(start);
                let period = fx.service.create(Owner::User, start_date).unwrap();
                fx.service
                    .end(Owner::User, period.id, start_date + chrono::Days::new(4))
                    .unwrap();
            }
        });
        for _ in 0..3 {
            scope.spawn(|| {
                for _ in 0..50 {
                    fx.service.stats(Owner::User).unwrap();
                }
            });
        }
    });

    let stats = fx.service.stats(Owner::User).unwrap();
    assert_eq!(stats.average_cycle_length, Some(28.0));
    assert_eq!(stats.average_period_length, Some(5.0));
    assert_eq!(stats.predicted_next_start, Some(date("2024-11-18")));
}
