/// Store and domain error types
///
/// Every [`Store`](crate::store::Store) operation returns [`StoreResult`].
/// Variants are grouped the way callers need to react to them:
///
/// - **Validation**: malformed input caught before any write
/// - **Not found**: a referenced user, group, or task is absent
/// - **Conflict**: duplicate identity or duplicate membership
/// - **Invariant**: the request would break a membership/assignment rule
/// - **Unavailable / Database**: the backing store failed
///
/// Store failures carry the underlying message for logging only; the HTTP
/// layer never forwards it to clients.

use uuid::Uuid;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the stores and the domain validation layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A deadline did not match `YYYY-MM-DD`
    #[error("Invalid deadline format: {0} (expected YYYY-MM-DD)")]
    InvalidDeadlineFormat(String),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Username or email is already taken
    #[error("A user with this {field} already exists")]
    DuplicateIdentity { field: &'static str },

    /// User is already in the group's member set
    #[error("User {user_id} is already a member of group {group_id}")]
    AlreadyMember { group_id: Uuid, user_id: Uuid },

    /// User is not in the group's member set
    #[error("User {user_id} is not a member of group {group_id}")]
    NotAMember { group_id: Uuid, user_id: Uuid },

    /// The group creator can never leave the member set
    #[error("The creator of group {0} cannot be removed")]
    CannotRemoveCreator(Uuid),

    /// Assignee is not a member of the task's board
    #[error("User {user_id} is not a member of board {board_id}")]
    AssigneeNotBoardMember { board_id: Uuid, user_id: Uuid },

    /// Store unreachable or operation timed out
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Unexpected database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Shorthand for a validation failure on `field`
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "user", id }
    }

    pub fn group_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "group", id }
    }

    /// Task routes call a group a "board"
    pub fn board_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "board", id }
    }

    pub fn task_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "task", id }
    }

    /// True for membership/assignment rule violations
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            StoreError::NotAMember { .. }
                | StoreError::CannotRemoveCreator(_)
                | StoreError::AssigneeNotBoardMember { .. }
        )
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return StoreError::DuplicateIdentity { field: "email" };
                    }
                    if constraint.contains("username") {
                        return StoreError::DuplicateIdentity { field: "username" };
                    }
                }
                StoreError::Database(db_err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = Uuid::new_v4();
        assert_eq!(
            StoreError::task_not_found(id).to_string(),
            format!("task {} not found", id)
        );
        assert_eq!(
            StoreError::DuplicateIdentity { field: "email" }.to_string(),
            "A user with this email already exists"
        );
        assert_eq!(
            StoreError::validation("title", "must not be empty").to_string(),
            "Invalid title: must not be empty"
        );
    }

    #[test]
    fn test_invariant_classification() {
        let (g, u) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(StoreError::CannotRemoveCreator(g).is_invariant_violation());
        assert!(StoreError::AssigneeNotBoardMember { board_id: g, user_id: u }
            .is_invariant_violation());
        assert!(!StoreError::AlreadyMember { group_id: g, user_id: u }.is_invariant_violation());
        assert!(!StoreError::group_not_found(g).is_invariant_violation());
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
