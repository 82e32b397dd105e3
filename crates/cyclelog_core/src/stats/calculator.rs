//! Summary statistics over an ordered period history.
//!
//! # Invariants
//! - Input must already be sorted by `start_date` ascending.
//! - Deterministic and side-effect free.

use crate::model::period::Period;
use crate::model::stats::PeriodStats;
use chrono::Days;

/// Derives `PeriodStats` from periods sorted ascending by start date.
pub fn compute_stats(periods: &[Period]) -> PeriodStats {
    let current_period = periods.iter().find(|period| period.is_open()).cloned();

    let durations: Vec<i64> = periods.iter().filter_map(Period::duration_days).collect();
    let average_period_length = mean(&durations).map(round_one_decimal);

    let gaps: Vec<i64> = periods
        .windows(2)
        .map(|pair| (pair[1].start_date - pair[0].start_date).num_days())
        .collect();
    let average_cycle_length = mean(&gaps).map(round_one_decimal);

    let predicted_next_start = match (average_cycle_length, periods.last()) {
        (Some(average), Some(last)) if average != 0.0 => {
            let days = average.round_ties_even();
            if days > 0.0 {
                last.start_date.checked_add_days(Days::new(days as u64))
            } else {
                last.start_date.checked_sub_days(Days::new((-days) as u64))
            }
        }
        _ => None,
    };

    PeriodStats {
        average_cycle_length,
        average_period_length,
        current_period,
        predicted_next_start,
    }
}

fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(sum as f64 / values.len() as f64)
}

/// Rounds to one decimal, sending exact halves to the even neighbour.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
