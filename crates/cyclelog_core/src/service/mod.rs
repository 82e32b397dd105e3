//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, storage and caching into use-case level APIs.
//! - Keep callers (HTTP, CLI) decoupled from storage details.

pub mod period_service;
