//! Period domain model.
//!
//! # Responsibility
//! - Define the canonical record for one recorded menstrual period.
//! - Define the owner tag that partitions stored history.
//!
//! # Invariants
//! - `id` and `created_at` are store-assigned and never change.
//! - `end_date` is `None` only for the single ongoing ("open") period.
//! - `end_date`, when set, is never earlier than `start_date`.
//! - Collections of different owners never reference each other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned identifier of one period row.
///
/// Unique only within one owner's collection.
pub type PeriodId = i64;

/// Number of distinct owners.
pub(crate) const OWNER_COUNT: usize = 2;

/// Tag selecting one of the isolated period collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// The real user's history.
    User,
    /// Seeded demo history, never mixed with user data.
    Demo,
}

impl Owner {
    /// Every owner, in slot order.
    pub const ALL: [Owner; OWNER_COUNT] = [Owner::User, Owner::Demo];

    /// Stable lowercase tag used in logs and external mappings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Demo => "demo",
        }
    }

    /// Dense index for per-owner slot arrays.
    pub(crate) fn slot(self) -> usize {
        match self {
            Self::User => 0,
            Self::Demo => 1,
        }
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an owner tag is not `user` or `demo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOwner(pub String);

impl Display for UnknownOwner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown owner `{}`; expected user|demo", self.0)
    }
}

impl Error for UnknownOwner {}

impl FromStr for Owner {
    type Err = UnknownOwner;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "demo" => Ok(Self::Demo),
            other => Err(UnknownOwner(other.to_string())),
        }
    }
}

/// Ordering of listed periods by `start_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One recorded period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub owner: Owner,
    pub start_date: NaiveDate,
    /// `None` while the period is ongoing.
    pub end_date: Option<NaiveDate>,
    /// Unix epoch milliseconds, assigned by the store at insertion.
    pub created_at: i64,
}

impl Period {
    /// Returns whether this period is still ongoing.
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Inclusive length in days, or `None` while open.
    ///
    /// A period starting and ending on the same day lasts one day.
    pub fn duration_days(&self) -> Option<i64> {
        self.end_date
            .map(|end| (end - self.start_date).num_days() + 1)
    }

    /// Whole days elapsed between `start_date` and `today`.
    pub fn days_since_start(&self, today: NaiveDate) -> i64 {
        (today - self.start_date).num_days()
    }
}
