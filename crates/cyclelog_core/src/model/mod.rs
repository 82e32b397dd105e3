//! Period tracking domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep stored records (`Period`) apart from derived values (`PeriodStats`).
//!
//! # Invariants
//! - Every stored record belongs to exactly one `Owner`.
//! - Deletion is permanent; there are no tombstones.

pub mod period;
pub mod stats;
