//! # Taskboard API Server Library
//!
//! HTTP surface for Taskboard: user signup and login, groups ("boards")
//! with members, tasks with board-constrained assignment, and dashboards.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
