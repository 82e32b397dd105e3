//! Interval validation for period date ranges.
//!
//! # Responsibility
//! - Check candidate dates against the accepted calendar window.
//! - Check candidate ranges against stored intervals for overlap and for a
//!   conflicting open period.
//!
//! # Invariants
//! - Pure functions; no I/O and no owner awareness.
//! - An absent end date is treated as unbounded future when comparing.

use crate::model::period::{Period, PeriodId};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Inclusive accepted window for recorded dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }
}

/// Validation failures detected before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Date falls outside the accepted window.
    OutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
    /// End date precedes start date.
    InvalidRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    /// Candidate range intersects a stored period.
    Overlap { conflicting_id: PeriodId },
    /// Another period is still open.
    OpenPeriodExists { id: PeriodId },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange {
                date,
                earliest,
                latest,
            } => write!(
                f,
                "date {date} is outside the accepted range {earliest}..={latest}"
            ),
            Self::InvalidRange {
                start_date,
                end_date,
            } => write!(
                f,
                "end date {end_date} must not be earlier than start date {start_date}"
            ),
            Self::Overlap { conflicting_id } => {
                write!(f, "date range overlaps existing period {conflicting_id}")
            }
            Self::OpenPeriodExists { id } => write!(
                f,
                "period {id} is still open; end it before starting a new one"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Fails when `date` lies outside `bounds`.
pub fn validate_range(date: NaiveDate, bounds: &DateBounds) -> Result<(), ValidationError> {
    if bounds.contains(date) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        date,
        earliest: bounds.earliest,
        latest: bounds.latest,
    })
}

/// Fails when a present `end_date` precedes `start_date`.
pub fn check_ordering(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match end_date {
        Some(end_date) if end_date < start_date => Err(ValidationError::InvalidRange {
            start_date,
            end_date,
        }),
        _ => Ok(()),
    }
}

/// Returns whether two inclusive day ranges share at least one day.
///
/// `None` ends are unbounded, so two open ranges always overlap.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: Option<NaiveDate>,
    b_start: NaiveDate,
    b_end: Option<NaiveDate>,
) -> bool {
    let b_reaches_a = b_end.map_or(true, |end| end >= a_start);
    let a_reaches_b = a_end.map_or(true, |end| b_start <= end);
    a_reaches_b && b_reaches_a
}

/// Fails with the first stored period (other than `exclude_id`) that
/// intersects `[start_date, end_date]`.
pub fn check_overlap(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    existing: &[Period],
    exclude_id: Option<PeriodId>,
) -> Result<(), ValidationError> {
    let conflict = existing
        .iter()
        .filter(|period| Some(period.id) != exclude_id)
        .find(|period| ranges_overlap(start_date, end_date, period.start_date, period.end_date));

    match conflict {
        Some(period) => Err(ValidationError::Overlap {
            conflicting_id: period.id,
        }),
        None => Ok(()),
    }
}

/// Fails when any stored period is still open.
///
/// Only consulted before starting a new period.
pub fn check_no_open_period(existing: &[Period]) -> Result<(), ValidationError> {
    match existing.iter().find(|period| period.is_open()) {
        Some(period) => Err(ValidationError::OpenPeriodExists { id: period.id }),
        None => Ok(()),
    }
}
