//! # TaskDeck Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the TaskDeck API server and the background worker.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, tasks, refresh tokens)
//! - `auth`: JWT tokens, password hashing, axum auth middleware
//! - `db`: Connection pool and migration runner
//! - `cache`: Redis client and cache-aside helpers
//! - `time`: Minute-granularity time helpers for the reminder window

pub mod auth;
pub mod cache;
pub mod db;
pub mod models;
pub mod time;

/// Current version of the TaskDeck shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
