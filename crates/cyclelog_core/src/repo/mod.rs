//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the store adapter contract the period service consumes.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateStart`)
//!   in addition to DB transport errors.
//! - Repositories never validate domain rules; the service does.

pub mod period_repo;
