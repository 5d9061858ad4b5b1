/// Domain models for Taskboard
///
/// Each model carries its own validation and the SQL it needs; the
/// [`Store`](crate::store::Store) implementations compose them into
/// transactional operations.
///
/// # Models
///
/// - `user`: User accounts (identity and credentials)
/// - `group`: Groups ("boards") with a creator and a member set
/// - `task`: Tasks, their enumerations, patches, and filters
/// - `dashboard`: Read-only aggregation over a set of tasks
///
/// # Example
///
/// ```
/// use taskboard_shared::models::parse_id;
///
/// assert!(parse_id("group_id", "not-a-uuid").is_err());
/// ```

pub mod dashboard;
pub mod group;
pub mod task;
pub mod user;

use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Parses an identifier received as an opaque string
///
/// # Errors
///
/// Returns `StoreError::Validation` naming `field` when `raw` is not a UUID.
pub fn parse_id(field: &str, raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| StoreError::validation(field, format!("'{}' is not a valid id", raw)))
}
