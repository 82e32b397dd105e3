//! Core domain logic for CycleLog period tracking.
//! This crate is the single source of truth for period history invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod stats;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::period::{Owner, Period, PeriodId, SortOrder, UnknownOwner};
pub use model::stats::PeriodStats;
pub use repo::period_repo::{
    PeriodRepository, PeriodStore, RepoError, RepoResult, SqlitePeriodRepository,
    SqlitePeriodStore,
};
pub use service::period_service::{PeriodService, PeriodServiceError, ServiceResult};
pub use stats::insights::{
    CycleInsights, CycleLengthPoint, DurationPoint, MonthlyPeriodDays, Regularity, WeekdayCount,
};
pub use validate::{DateBounds, ValidationError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
