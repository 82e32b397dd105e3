//! Per-owner, time-bounded memoization of `PeriodStats`.
//!
//! # Responsibility
//! - Serve recently computed stats without touching storage.
//! - Drop an owner's entry synchronously when its history changes.
//!
//! # Invariants
//! - One lock per owner slot; owners never contend or share entries.
//! - An entry is never served at or after its expiry instant.
//! - A recomputation that raced with `invalidate` is not stored.

use crate::model::period::{Owner, OWNER_COUNT};
use crate::model::stats::PeriodStats;
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Slot {
    /// Bumped by every invalidation.
    generation: u64,
    entry: Option<CachedStats>,
}

#[derive(Debug, Clone)]
struct CachedStats {
    stats: PeriodStats,
    expires_at: Instant,
}

/// Stats cache owned by one service instance.
#[derive(Debug)]
pub struct StatsCache {
    ttl: Duration,
    slots: [Mutex<Slot>; OWNER_COUNT],
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Default::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live entry for `owner`, or computes, stores and returns a
    /// fresh one.
    ///
    /// `compute` runs without the slot lock held. Its error is returned
    /// unchanged and leaves the slot untouched.
    pub fn get_or_compute<E>(
        &self,
        owner: Owner,
        now: Instant,
        compute: impl FnOnce() -> Result<PeriodStats, E>,
    ) -> Result<PeriodStats, E> {
        let generation = {
            let slot = self.lock(owner);
            if let Some(entry) = slot.entry.as_ref() {
                if now < entry.expires_at {
                    debug!(
                        "event=stats_cache module=stats status=hit owner={}",
                        owner
                    );
                    return Ok(entry.stats.clone());
                }
            }
            slot.generation
        };

        debug!(
            "event=stats_cache module=stats status=miss owner={}",
            owner
        );
        let stats = compute()?;

        let mut slot = self.lock(owner);
        if slot.generation == generation {
            slot.entry = Some(CachedStats {
                stats: stats.clone(),
                expires_at: now + self.ttl,
            });
        } else {
            debug!(
                "event=stats_cache module=stats status=discarded owner={} reason=invalidated",
                owner
            );
        }
        Ok(stats)
    }

    /// Returns the live entry for `owner` without computing anything.
    #[cfg(test)]
    fn peek(&self, owner: Owner, now: Instant) -> Option<PeriodStats> {
        self.lock(owner)
            .entry
            .as_ref()
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.stats.clone())
    }

    /// Discards the entry for `owner`, forcing the next read to recompute.
    pub fn invalidate(&self, owner: Owner) {
        let mut slot = self.lock(owner);
        slot.generation = slot.generation.wrapping_add(1);
        slot.entry = None;
        debug!(
            "event=stats_cache module=stats status=invalidated owner={}",
            owner
        );
    }

    fn lock(&self, owner: Owner) -> MutexGuard<'_, Slot> {
        // Entries are replaced wholesale, so a poisoned slot is still whole.
        self.slots[owner.slot()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
