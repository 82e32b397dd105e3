//! Core tuning knobs.
//!
//! # Responsibility
//! - Hold the stats cache TTL and the accepted date window.
//! - Derive per-call `DateBounds` from the current date.
//!
//! # Invariants
//! - Bounds are recomputed from "today" on every call, never cached.

use crate::validate::DateBounds;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_STATS_TTL_SECS: u64 = 30;
const DEFAULT_HISTORY_YEARS: u32 = 10;
const DEFAULT_FUTURE_TOLERANCE_DAYS: u32 = 1;

/// Runtime configuration for the period service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Lifetime of one cached stats entry, in seconds.
    pub stats_ttl_secs: u64,
    /// How far back recorded dates may reach.
    pub history_years: u32,
    /// How many days past "today" are still accepted (timezone skew).
    pub future_tolerance_days: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            stats_ttl_secs: DEFAULT_STATS_TTL_SECS,
            history_years: DEFAULT_HISTORY_YEARS,
            future_tolerance_days: DEFAULT_FUTURE_TOLERANCE_DAYS,
        }
    }
}

impl CoreConfig {
    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl_secs)
    }

    /// Accepted window `[today - history_years, today + future_tolerance_days]`.
    ///
    /// Feb 29 minus whole years clamps to Feb 28.
    pub fn date_bounds(&self, today: NaiveDate) -> DateBounds {
        let earliest = today
            .checked_sub_months(Months::new(self.history_years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN);
        let latest = today
            .checked_add_days(Days::new(u64::from(self.future_tolerance_days)))
            .unwrap_or(NaiveDate::MAX);
        DateBounds { earliest, latest }
    }
}
