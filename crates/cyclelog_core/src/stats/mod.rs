//! Derived statistics over period history.
//!
//! # Responsibility
//! - Compute summary stats and analytics from ordered history.
//! - Memoize summary stats per owner behind a short TTL.
//!
//! # Invariants
//! - Calculators are owner-agnostic and operate only on the list given.

pub mod cache;
pub mod calculator;
pub mod insights;
