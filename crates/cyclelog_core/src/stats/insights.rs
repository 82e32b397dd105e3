//! History analytics beyond the cached summary stats.
//!
//! # Responsibility
//! - Expose per-cycle and per-period series for charting.
//! - Score cycle regularity from the spread of cycle lengths.
//! - Bucket bleeding days by month and start dates by weekday.
//!
//! # Invariants
//! - Input must already be sorted by `start_date` ascending.
//! - Year filtering selects periods by the year of their start date, except
//!   for monthly days, which count each day in the year it falls in.
//! - An open period counts as running through `today`.

use crate::model::period::Period;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Coefficient of variation at which regularity bottoms out at zero.
const IRREGULAR_CV: f64 = 0.3;

const WEEK_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Days between one start and the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleLengthPoint {
    /// Start date of the later period.
    pub start_date: NaiveDate,
    pub length_days: i64,
}

/// Inclusive length of one completed period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationPoint {
    pub start_date: NaiveDate,
    pub duration_days: i64,
}

/// Bleeding days that fell in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPeriodDays {
    /// 1 = January.
    pub month: u32,
    pub days: u32,
}

/// How many periods started on one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayCount {
    pub weekday: Weekday,
    pub count: u32,
    /// Set on every weekday sharing the highest non-zero count.
    pub is_max: bool,
}

/// Bucketed reading of `regularity_score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularity {
    VeryRegular,
    Regular,
    ModerateVariation,
    SomewhatIrregular,
    Irregular,
    InsufficientData,
}

impl Regularity {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => Self::InsufficientData,
            Some(value) if value >= 80.0 => Self::VeryRegular,
            Some(value) if value >= 60.0 => Self::Regular,
            Some(value) if value >= 40.0 => Self::ModerateVariation,
            Some(value) if value >= 20.0 => Self::SomewhatIrregular,
            Some(_) => Self::Irregular,
        }
    }
}

/// Uncached analytics over one owner's (optionally year-filtered) history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleInsights {
    /// Year filter applied, if any.
    pub year: Option<i32>,
    /// Distinct start years across the whole history, newest first.
    pub available_years: Vec<i32>,
    pub cycle_lengths: Vec<CycleLengthPoint>,
    pub period_durations: Vec<DurationPoint>,
    pub average_cycle_length: Option<f64>,
    pub average_period_length: Option<f64>,
    /// Population standard deviation of durations; needs two or more.
    pub duration_std_dev: Option<f64>,
    /// 100 for perfectly even cycles, 0 at a coefficient of variation of 0.3+.
    pub regularity_score: Option<f64>,
    pub regularity: Regularity,
    /// Twelve entries, January first. Without a year filter each month is
    /// averaged over the number of years with data.
    pub monthly_period_days: Vec<MonthlyPeriodDays>,
    /// Seven entries, Monday first.
    pub start_weekday_counts: Vec<WeekdayCount>,
}

/// Computes insights for periods sorted ascending by start date.
pub fn compute_insights(
    periods: &[Period],
    year: Option<i32>,
    today: NaiveDate,
) -> CycleInsights {
    let available_years: Vec<i32> = periods
        .iter()
        .map(|period| period.start_date.year())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .rev()
        .collect();

    let selected: Vec<&Period> = periods
        .iter()
        .filter(|period| year.map_or(true, |year| period.start_date.year() == year))
        .collect();

    let cycle_lengths: Vec<CycleLengthPoint> = selected
        .windows(2)
        .map(|pair| CycleLengthPoint {
            start_date: pair[1].start_date,
            length_days: (pair[1].start_date - pair[0].start_date).num_days(),
        })
        .filter(|point| point.length_days > 0)
        .collect();

    let period_durations: Vec<DurationPoint> = selected
        .iter()
        .filter_map(|period| {
            period.duration_days().map(|duration_days| DurationPoint {
                start_date: period.start_date,
                duration_days,
            })
        })
        .collect();

    let lengths: Vec<f64> = cycle_lengths
        .iter()
        .map(|point| point.length_days as f64)
        .collect();
    let durations: Vec<f64> = period_durations
        .iter()
        .map(|point| point.duration_days as f64)
        .collect();

    let duration_std_dev = if durations.len() >= 2 {
        population_std_dev(&durations)
    } else {
        None
    };
    let regularity_score = regularity_score(&lengths);
    let year_count = if year.is_none() {
        available_years.len().max(1)
    } else {
        1
    };
    let monthly_period_days = monthly_period_days(periods, year, today, year_count);
    let start_weekday_counts = start_weekday_counts(&selected);

    CycleInsights {
        year,
        available_years,
        average_cycle_length: mean(&lengths),
        average_period_length: mean(&durations),
        cycle_lengths,
        period_durations,
        duration_std_dev,
        regularity_score,
        regularity: Regularity::from_score(regularity_score),
        monthly_period_days,
        start_weekday_counts,
    }
}

fn monthly_period_days(
    periods: &[Period],
    year: Option<i32>,
    today: NaiveDate,
    year_count: usize,
) -> Vec<MonthlyPeriodDays> {
    let mut counts = [0_u32; 12];
    for period in periods {
        let end = period.end_date.unwrap_or(today);
        for day in period.start_date.iter_days().take_while(|day| *day <= end) {
            if year.map_or(true, |year| day.year() == year) {
                counts[day.month0() as usize] += 1;
            }
        }
    }

    counts
        .iter()
        .zip(1_u32..)
        .map(|(&count, month)| {
            let days = if year_count > 1 {
                (f64::from(count) / year_count as f64).round() as u32
            } else {
                count
            };
            MonthlyPeriodDays { month, days }
        })
        .collect()
}

fn start_weekday_counts(selected: &[&Period]) -> Vec<WeekdayCount> {
    let mut counts = [0_u32; 7];
    for period in selected {
        counts[period.start_date.weekday().num_days_from_monday() as usize] += 1;
    }
    let max = counts.iter().copied().max().unwrap_or(0);

    WEEK_ORDER
        .iter()
        .map(|&weekday| {
            let count = counts[weekday.num_days_from_monday() as usize];
            WeekdayCount {
                weekday,
                count,
                is_max: max > 0 && count == max,
            }
        })
        .collect()
}

fn regularity_score(lengths: &[f64]) -> Option<f64> {
    if lengths.len() < 2 {
        return None;
    }
    let average = mean(lengths)?;
    if average <= 0.0 {
        return None;
    }
    let cv = population_std_dev(lengths)? / average;
    Some(((1.0 - cv / IRREGULAR_CV) * 100.0).clamp(0.0, 100.0))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn population_std_dev(values: &[f64]) -> Option<f64> {
    let average = mean(values)?;
    let variance = values
        .iter()
        .map(|value| (value - average).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}
