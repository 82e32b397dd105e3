//! Period use-case service.
//!
//! # Responsibility
//! - Provide list/get/create/end/update/delete and stats entry points.
//! - Run interval validation against current stored state inside the same
//!   write transaction as the mutation.
//! - Keep the per-owner stats cache coherent with committed history.
//!
//! # Invariants
//! - Per owner: at most one open period, no overlapping ranges, unique
//!   start dates, `end_date >= start_date`, all dates inside the window.
//! - Every validation failure is reported before any write.
//! - The stats cache is invalidated only after a successful commit.
//! - Owners are fully isolated; no operation reads another owner's rows.

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::model::period::{Owner, Period, PeriodId, SortOrder};
use crate::model::stats::PeriodStats;
use crate::repo::period_repo::{PeriodRepository, PeriodStore, RepoError};
use crate::stats::cache::StatsCache;
use crate::stats::calculator::compute_stats;
use crate::stats::insights::{compute_insights, CycleInsights};
use crate::validate::{
    check_no_open_period, check_ordering, check_overlap, validate_range, DateBounds,
    ValidationError,
};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Service error for period use-cases.
#[derive(Debug)]
pub enum PeriodServiceError {
    /// A date falls outside the accepted window.
    OutOfRange {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },
    /// Starting a period while another one is still open.
    OpenPeriodExists { open_id: PeriodId },
    /// Candidate range intersects a stored period.
    Overlap { conflicting_id: PeriodId },
    /// `end_date` precedes `start_date`.
    InvalidRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    /// The period already has an end date.
    AlreadyEnded { id: PeriodId, end_date: NaiveDate },
    /// Storage rejected a second period with the same start date.
    DuplicateStart { owner: Owner, start_date: NaiveDate },
    /// No period with this id exists for the owner.
    NotFound { owner: Owner, id: PeriodId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl PeriodServiceError {
    /// Stable snake_case code for transport-level mapping and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "out_of_range",
            Self::OpenPeriodExists { .. } => "open_period_exists",
            Self::Overlap { .. } => "overlap",
            Self::InvalidRange { .. } => "invalid_range",
            Self::AlreadyEnded { .. } => "already_ended",
            Self::DuplicateStart { .. } => "duplicate_start",
            Self::NotFound { .. } => "not_found",
            Self::Repo(_) => "storage",
        }
    }
}

impl Display for PeriodServiceError {
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
            Self::OpenPeriodExists { open_id } => write!(
                f,
                "period {open_id} is still open; end it before starting a new one"
            ),
            Self::Overlap { conflicting_id } => {
                write!(f, "date range overlaps existing period {conflicting_id}")
            }
            Self::InvalidRange {
                start_date,
                end_date,
            } => write!(
                f,
                "end date {end_date} must not be earlier than start date {start_date}"
            ),
            Self::AlreadyEnded { id, end_date } => {
                write!(f, "period {id} already ended on {end_date}")
            }
            Self::DuplicateStart { owner, start_date } => {
                write!(f, "a {owner} period already starts on {start_date}")
            }
            Self::NotFound { owner, id } => write!(f, "period not found: {owner}/{id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PeriodServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PeriodServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { owner, id } => Self::NotFound { owner, id },
            RepoError::DuplicateStart { owner, start_date } => {
                Self::DuplicateStart { owner, start_date }
            }
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for PeriodServiceError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::OutOfRange {
                date,
                earliest,
                latest,
            } => Self::OutOfRange {
                date,
                earliest,
                latest,
            },
            ValidationError::InvalidRange {
                start_date,
                end_date,
            } => Self::InvalidRange {
                start_date,
                end_date,
            },
            ValidationError::Overlap { conflicting_id } => Self::Overlap { conflicting_id },
            ValidationError::OpenPeriodExists { id } => Self::OpenPeriodExists { open_id: id },
        }
    }
}

pub type ServiceResult<T> = Result<T, PeriodServiceError>;

/// Period service facade over a transactional store.
pub struct PeriodService<S: PeriodStore> {
    store: S,
    cache: StatsCache,
    clock: Arc<dyn Clock>,
    config: CoreConfig,
}

impl<S: PeriodStore> PeriodService<S> {
    /// Creates a service with default configuration and the system clock.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_config(store: S, config: CoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: StatsCache::new(config.stats_ttl()),
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Lists all periods of `owner`, newest start first.
    pub fn list(&self, owner: Owner) -> ServiceResult<Vec<Period>> {
        self.store.read(|repo| -> ServiceResult<Vec<Period>> {
            Ok(repo.fetch_all_ordered(owner, SortOrder::Descending)?)
        })
    }

    /// Gets one period by id.
    pub fn get(&self, owner: Owner, id: PeriodId) -> ServiceResult<Period> {
        self.store.read(|repo| fetch_existing(repo, owner, id))
    }

    /// Starts a new open period on `start_date`.
    ///
    /// # Errors
    /// - `OutOfRange`, `OpenPeriodExists`, `Overlap`, `DuplicateStart`.
    pub fn create(&self, owner: Owner, start_date: NaiveDate) -> ServiceResult<Period> {
        let bounds = self.bounds();
        let result = self.store.write(|repo| -> ServiceResult<Period> {
            validate_range(start_date, &bounds)?;
            let existing = repo.fetch_all_ordered(owner, SortOrder::Ascending)?;
            check_no_open_period(&existing)?;
            check_overlap(start_date, None, &existing, None)?;
            Ok(repo.insert(owner, start_date, None)?)
        });
        self.finish_mutation("period_create", owner, result)
    }

    /// Sets the end date of an open period.
    ///
    /// # Errors
    /// - `NotFound`, `AlreadyEnded`, `InvalidRange`, `OutOfRange`, `Overlap`.
    pub fn end(&self, owner: Owner, id: PeriodId, end_date: NaiveDate) -> ServiceResult<Period> {
        let bounds = self.bounds();
        let result = self.store.write(|repo| -> ServiceResult<Period> {
            let mut period = fetch_existing(repo, owner, id)?;
            if let Some(existing_end) = period.end_date {
                return Err(PeriodServiceError::AlreadyEnded {
                    id,
                    end_date: existing_end,
                });
            }
            check_ordering(period.start_date, Some(end_date))?;
            validate_range(end_date, &bounds)?;
            let existing = repo.fetch_all_ordered(owner, SortOrder::Ascending)?;
            check_overlap(period.start_date, Some(end_date), &existing, Some(id))?;

            period.end_date = Some(end_date);
            repo.update(&period)?;
            Ok(period)
        });
        self.finish_mutation("period_end", owner, result)
    }

    /// Rewrites both dates of an existing period.
    ///
    /// May reopen a closed period or close an open one; both are checked
    /// against every other stored range.
    ///
    /// # Errors
    /// - `NotFound`, `OutOfRange`, `InvalidRange`, `Overlap`, `DuplicateStart`.
    pub fn update(
        &self,
        owner: Owner,
        id: PeriodId,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> ServiceResult<Period> {
        let bounds = self.bounds();
        let result = self.store.write(|repo| -> ServiceResult<Period> {
            let mut period = fetch_existing(repo, owner, id)?;
            validate_range(start_date, &bounds)?;
            if let Some(end_date) = end_date {
                validate_range(end_date, &bounds)?;
            }
            check_ordering(start_date, end_date)?;
            let existing = repo.fetch_all_ordered(owner, SortOrder::Ascending)?;
            check_overlap(start_date, end_date, &existing, Some(id))?;

            period.start_date = start_date;
            period.end_date = end_date;
            repo.update(&period)?;
            Ok(period)
        });
        self.finish_mutation("period_update", owner, result)
    }

    /// Permanently removes one period.
    pub fn delete(&self, owner: Owner, id: PeriodId) -> ServiceResult<()> {
        let result = self.store.write(|repo| -> ServiceResult<()> {
            Ok(repo.delete(owner, id)?)
        });
        match result {
            Ok(()) => {
                self.cache.invalidate(owner);
                info!(
                    "event=period_delete module=service status=ok owner={} id={}",
                    owner, id
                );
                Ok(())
            }
            Err(err) => Err(log_failure("period_delete", owner, err)),
        }
    }

    /// Returns summary stats, served from cache while fresh.
    pub fn stats(&self, owner: Owner) -> ServiceResult<PeriodStats> {
        self.cache.get_or_compute(owner, self.clock.now(), || {
            self.store.read(|repo| -> ServiceResult<PeriodStats> {
                let history = repo.fetch_all_ordered(owner, SortOrder::Ascending)?;
                Ok(compute_stats(&history))
            })
        })
    }

    /// Returns uncached analytics, optionally restricted to one start year.
    pub fn insights(&self, owner: Owner, year: Option<i32>) -> ServiceResult<CycleInsights> {
        let today = self.clock.today();
        self.store.read(|repo| -> ServiceResult<CycleInsights> {
            let history = repo.fetch_all_ordered(owner, SortOrder::Ascending)?;
            Ok(compute_insights(&history, year, today))
        })
    }

    fn bounds(&self) -> DateBounds {
        self.config.date_bounds(self.clock.today())
    }

    fn finish_mutation(
        &self,
        event: &'static str,
        owner: Owner,
        result: ServiceResult<Period>,
    ) -> ServiceResult<Period> {
        match result {
            Ok(period) => {
                self.cache.invalidate(owner);
                info!(
                    "event={} module=service status=ok owner={} id={} start_date={} end_date={}",
                    event,
                    owner,
                    period.id,
                    period.start_date,
                    period
                        .end_date
                        .map_or_else(|| "open".to_string(), |date| date.to_string())
                );
                Ok(period)
            }
            Err(err) => Err(log_failure(event, owner, err)),
        }
    }
}

fn fetch_existing(
    repo: &dyn PeriodRepository,
    owner: Owner,
    id: PeriodId,
) -> ServiceResult<Period> {
    repo.fetch_by_id(owner, id)?
        .ok_or(PeriodServiceError::NotFound { owner, id })
}

fn log_failure(
    event: &'static str,
    owner: Owner,
    err: PeriodServiceError,
) -> PeriodServiceError {
    warn!(
        "event={} module=service status=error owner={} error_code={} error={}",
        event,
        owner,
        err.kind(),
        err
    );
    err
}
