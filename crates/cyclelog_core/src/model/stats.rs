//! Derived cycle statistics.
//!
//! Values here are never persisted. They are recomputed from the ordered
//! history and cached per owner for a short time.

use crate::model::period::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Summary statistics over one owner's history.
///
/// Every field is `None` when the history is too short to derive it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodStats {
    /// Mean days between consecutive starts, one decimal.
    pub average_cycle_length: Option<f64>,
    /// Mean inclusive length of completed periods, one decimal.
    pub average_period_length: Option<f64>,
    /// The open period, if any.
    pub current_period: Option<Period>,
    /// Last start plus the rounded average cycle length.
    pub predicted_next_start: Option<NaiveDate>,
}
