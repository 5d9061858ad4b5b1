/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Signup, login, and user lookup
/// - `groups`: Groups and their members
/// - `tasks`: Tasks, assignment, and dashboards

pub mod groups;
pub mod health;
pub mod tasks;
pub mod users;

use serde::{Deserialize, Serialize};

/// Body returned by delete routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
