//! Period repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide fetch/insert/update/delete over one owner's period table.
//! - Own transaction boundaries for service-level units of work.
//! - Map the owner tag to its physical table.
//!
//! # Invariants
//! - Every query is scoped to exactly one owner's table.
//! - A `UNIQUE(start_date)` violation surfaces as `RepoError::DuplicateStart`.
//! - Read paths reject malformed rows instead of masking them.
//! - `PeriodStore::write` commits only when the unit of work returns `Ok`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::period::{Owner, Period, PeriodId, SortOrder};
use chrono::NaiveDate;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const PERIOD_COLUMNS: [&str; 4] = ["id", "start_date", "end_date", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for period persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound {
        owner: Owner,
        id: PeriodId,
    },
    /// Another row of the same owner already starts on this date.
    DuplicateStart {
        owner: Owner,
        start_date: NaiveDate,
    },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { owner, id } => write!(f, "period not found: {owner}/{id}"),
            Self::DuplicateStart { owner, start_date } => {
                write!(f, "a {owner} period already starts on {start_date}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted period data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store adapter operations over one owner's collection.
pub trait PeriodRepository {
    fn fetch_by_id(&self, owner: Owner, id: PeriodId) -> RepoResult<Option<Period>>;
    fn fetch_all_ordered(&self, owner: Owner, order: SortOrder) -> RepoResult<Vec<Period>>;
    /// Inserts one row and returns it with store-assigned `id`/`created_at`.
    fn insert(
        &self,
        owner: Owner,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> RepoResult<Period>;
    /// Rewrites both dates of `period` in `period.owner`'s collection.
    fn update(&self, period: &Period) -> RepoResult<()>;
    fn delete(&self, owner: Owner, id: PeriodId) -> RepoResult<()>;
}

/// Transaction boundary around repository access.
pub trait PeriodStore {
    /// Runs `op` against committed state, outside any write transaction.
    fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn PeriodRepository) -> Result<T, E>;

    /// Runs `op` inside one write transaction.
    ///
    /// Commits when `op` returns `Ok`; rolls back otherwise.
    fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn PeriodRepository) -> Result<T, E>;
}

/// Maps an owner to its physical table.
pub fn owner_table(owner: Owner) -> &'static str {
    match owner {
        Owner::User => "periods",
        Owner::Demo => "demo_periods",
    }
}

/// SQLite-backed period repository over a borrowed connection or transaction.
pub struct SqlitePeriodRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePeriodRepository<'conn> {
    /// Wraps a connection that has already passed `ensure_schema_ready`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PeriodRepository for SqlitePeriodRepository<'_> {
    fn fetch_by_id(&self, owner: Owner, id: PeriodId) -> RepoResult<Option<Period>> {
        let sql = format!(
            "SELECT id, start_date, end_date, created_at
             FROM {}
             WHERE id = ?1;",
            owner_table(owner)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_period_row(owner, row)?));
        }
        Ok(None)
    }

    fn fetch_all_ordered(&self, owner: Owner, order: SortOrder) -> RepoResult<Vec<Period>> {
        let direction = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let sql = format!(
            "SELECT id, start_date, end_date, created_at
             FROM {}
             ORDER BY start_date {direction}, id {direction};",
            owner_table(owner)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut periods = Vec::new();
        while let Some(row) = rows.next()? {
            periods.push(parse_period_row(owner, row)?);
        }
        Ok(periods)
    }

    fn insert(
        &self,
        owner: Owner,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> RepoResult<Period> {
        let sql = format!(
            "INSERT INTO {} (start_date, end_date) VALUES (?1, ?2);",
            owner_table(owner)
        );
        self.conn
            .execute(
                &sql,
                params![date_to_db(start_date), end_date.map(date_to_db)],
            )
            .map_err(|err| map_write_error(err, owner, start_date))?;

        let id = self.conn.last_insert_rowid();
        self.fetch_by_id(owner, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "inserted row {id} missing from `{}` on read-back",
                owner_table(owner)
            ))
        })
    }

    fn update(&self, period: &Period) -> RepoResult<()> {
        let sql = format!(
            "UPDATE {}
             SET start_date = ?1, end_date = ?2
             WHERE id = ?3;",
            owner_table(period.owner)
        );
        let changed = self
            .conn
            .execute(
                &sql,
                params![
                    date_to_db(period.start_date),
                    period.end_date.map(date_to_db),
                    period.id
                ],
            )
            .map_err(|err| map_write_error(err, period.owner, period.start_date))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                owner: period.owner,
                id: period.id,
            });
        }
        Ok(())
    }

    fn delete(&self, owner: Owner, id: PeriodId) -> RepoResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1;", owner_table(owner));
        let changed = self.conn.execute(&sql, [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound { owner, id });
        }
        Ok(())
    }
}

/// Thread-safe store owning one migrated SQLite connection.
pub struct SqlitePeriodStore {
    conn: Mutex<Connection>,
}

impl SqlitePeriodStore {
    /// Takes ownership of a migrated connection after checking its schema.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-transaction drops the transaction, which rolls back.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PeriodStore for SqlitePeriodStore {
    fn read<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn PeriodRepository) -> Result<T, E>,
    {
        let conn = self.lock();
        op(&SqlitePeriodRepository::new(&conn))
    }

    fn write<T, E, F>(&self, op: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn PeriodRepository) -> Result<T, E>,
    {
        let mut conn = self.lock();
        // IMMEDIATE takes the database write lock up front, serialising
        // validate-then-write across every connection to the same file.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let outcome = op(&SqlitePeriodRepository::new(&tx));
        match outcome {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=tx_rollback module=repo status=error error={}",
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}

/// Checks that `conn` is migrated to the latest schema with both owner tables.
pub fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for owner in Owner::ALL {
        let table = owner_table(owner);
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for column in PERIOD_COLUMNS {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn parse_period_row(owner: Owner, row: &Row<'_>) -> RepoResult<Period> {
    let table = owner_table(owner);
    let start_text: String = row.get("start_date")?;
    let start_date = parse_date(&start_text, table, "start_date")?;
    let end_date = match row.get::<_, Option<String>>("end_date")? {
        Some(value) => Some(parse_date(&value, table, "end_date")?),
        None => None,
    };

    if let Some(end_date) = end_date {
        if end_date < start_date {
            return Err(RepoError::InvalidData(format!(
                "end_date {end_date} precedes start_date {start_date} in {table}"
            )));
        }
    }

    Ok(Period {
        id: row.get("id")?,
        owner,
        start_date,
        end_date,
        created_at: row.get("created_at")?,
    })
}

fn parse_date(value: &str, table: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {table}.{column}")))
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn map_write_error(err: rusqlite::Error, owner: Owner, start_date: NaiveDate) -> RepoError {
    let err = DbError::from(err);
    if err.is_unique_violation() {
        RepoError::DuplicateStart { owner, start_date }
    } else {
        RepoError::Db(err)
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists = conn
        .query_row(
            "SELECT 1
             FROM sqlite_master
             WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
