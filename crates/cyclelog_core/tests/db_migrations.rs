use cyclelog_core::db::migrations::latest_version;
use cyclelog_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "periods");
    assert_table_exists(&conn, "demo_periods");
}

#[test]
fn demo_collection_is_seeded_and_user_collection_starts_empty() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(row_count(&conn, "periods"), 0);
    assert_eq!(row_count(&conn, "demo_periods"), 27);
    let open_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM demo_periods WHERE end_date IS NULL;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(open_rows, 1);
}

#[test]
fn start_date_is_unique_per_table() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO periods (start_date, end_date) VALUES ('2025-01-01', NULL);",
        [],
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO periods (start_date, end_date) VALUES ('2025-01-01', '2025-01-04');",
            [],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_unique_violation());

    // The same date in the other owner's table is unrelated.
    conn.execute(
        "INSERT INTO demo_periods (start_date, end_date) VALUES ('2025-01-01', '2025-01-04');",
        [],
    )
    .unwrap();
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cyclelog.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(row_count(&conn_second, "demo_periods"), 27);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn row_count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
