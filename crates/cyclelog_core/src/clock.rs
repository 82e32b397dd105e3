//! Time sources for date validation and cache expiry.
//!
//! # Responsibility
//! - Provide "today" for date bounds validation.
//! - Provide a monotonic instant for cache expiry.
//!
//! # Invariants
//! - `now()` never goes backwards for one clock instance.

use chrono::{Local, NaiveDate};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Injectable source of calendar date and monotonic time.
pub trait Clock: Send + Sync {
    /// Current local calendar date.
    fn today(&self) -> NaiveDate;
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Wall-clock implementation backed by the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock for tests and replay tooling.
///
/// Both the calendar date and the monotonic instant only move when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    today: NaiveDate,
    elapsed: Duration,
}

impl ManualClock {
    /// Creates a clock pinned at `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            base: Instant::now(),
            state: Mutex::new(ManualState {
                today,
                elapsed: Duration::ZERO,
            }),
        }
    }

    /// Moves the calendar date without touching the monotonic instant.
    pub fn set_today(&self, today: NaiveDate) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .today = today;
    }

    /// Advances the monotonic instant.
    pub fn advance(&self, by: Duration) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed += by;
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .today
    }

    fn now(&self) -> Instant {
        let elapsed = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed;
        self.base + elapsed
    }
}
