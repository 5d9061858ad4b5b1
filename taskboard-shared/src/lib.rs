//! # Taskboard Shared Library
//!
//! Domain types, persistence, and authentication for the Taskboard API:
//! users, groups ("boards"), and tasks, with membership-constrained task
//! assignment and dashboard aggregation.
//!
//! ## Module Organization
//!
//! - `models`: Users, groups, tasks, dashboards, and their validation
//! - `store`: The `Store` trait with PostgreSQL and in-memory implementations
//! - `auth`: Password hashing, JWT tokens, bearer resolution, authorization
//! - `db`: Connection pool and embedded migrations
//! - `error`: `StoreError`, the error type of every store operation

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
