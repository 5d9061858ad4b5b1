/// Store abstraction
///
/// [`Store`] is the single seam between request handlers and persistence.
/// The HTTP layer holds it as `Arc<dyn Store>` in application state; nothing
/// reaches the database through a global handle.
///
/// # Implementations
///
/// - [`PgStore`]: PostgreSQL via sqlx, one transaction per mutating call and
///   a timeout around every operation
/// - [`MemoryStore`]: in-process maps behind a single `RwLock`, used by the
///   test suites and for local runs without a database
///
/// # Consistency Rules
///
/// Both implementations enforce the same rules:
///
/// - a group's creator is in its member set from creation on and can never
///   be removed from it
/// - every task assignee is a member of the task's board at assignment time
/// - removing a member unassigns them from every task on that board, in the
///   same atomic step
/// - deleting a group deletes its tasks
///
/// # Example
///
/// ```
/// use taskboard_shared::store::{MemoryStore, Store};
/// use taskboard_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let ada = store.create_user(CreateUser {
///     username: "ada".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     photo: None,
/// }).await?;
///
/// let group = store.create_group("Launch", ada.id).await?;
/// assert!(group.has_member(ada.id));
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password_or_dummy};
use crate::error::{StoreError, StoreResult};
use crate::models::dashboard::Dashboard;
use crate::models::group::Group;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, RegisterUser, User};

/// Persistence operations for users, groups, and tasks
#[async_trait]
pub trait Store: Send + Sync {
    /// Verifies the backing store is reachable
    async fn health_check(&self) -> StoreResult<()>;

    // ---------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------

    /// Inserts a user whose password is already hashed
    ///
    /// Fails with `DuplicateIdentity` when the username or the email
    /// (compared case-insensitively) is taken.
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Loads every existing user among `ids`, ordered by username
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Lists users, oldest first
    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>>;

    /// Stamps the user's last login time
    async fn record_login(&self, user_id: Uuid) -> StoreResult<()>;

    // ---------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------

    /// Creates a group with `creator_id` as creator and first member
    async fn create_group(&self, name: &str, creator_id: Uuid) -> StoreResult<Group>;

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;

    /// Lists the groups `user_id` is a member of, oldest first
    async fn list_groups_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Group>>;

    /// Adds a member; fails with `NotFound` or `AlreadyMember`
    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group>;

    /// Removes a member and unassigns them from the group's tasks
    ///
    /// Fails with `NotFound`, `NotAMember`, or `CannotRemoveCreator`. On
    /// failure nothing changes.
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group>;

    /// Deletes a group together with its tasks
    async fn delete_group(&self, group_id: Uuid) -> StoreResult<()>;

    // ---------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------

    /// Creates a task on an existing board
    ///
    /// Fails with `NotFound` for a missing board and
    /// `AssigneeNotBoardMember` for an initial assignee outside the board.
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Applies a validated patch
    ///
    /// A supplied assignee set is checked against the board's current
    /// members before anything is written.
    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Task>;

    /// Assigns a board member to a task; assigning twice is a no-op
    async fn assign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task>;

    /// Unassigns a user; unassigning someone not assigned is a no-op
    async fn unassign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<()>;

    /// Lists tasks matching every condition of `filter`, oldest first
    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>>;

    // ---------------------------------------------------------------
    // Provided operations
    // ---------------------------------------------------------------

    /// Hashes the password and creates the user
    ///
    /// Input is expected to be validated already. Plaintext never reaches
    /// `create_user`.
    async fn register_user(&self, input: RegisterUser) -> StoreResult<User> {
        let input = input.normalized();
        let password = input.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| StoreError::Database(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| StoreError::Database(e.to_string()))?;

        self.create_user(CreateUser {
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash,
            photo: input.photo,
        })
        .await
    }

    /// Returns the user if `password` matches the stored hash
    ///
    /// Unknown emails still pay for one hash verification so response time
    /// does not reveal whether an account exists.
    async fn verify_credentials(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let user = self.find_user_by_email(email.trim()).await?;
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let password = password.to_string();

        let verified = tokio::task::spawn_blocking(move || {
            verify_password_or_dummy(&password, stored_hash.as_deref())
        })
        .await
        .map_err(|e| StoreError::Database(format!("Password verification task failed: {}", e)))?;

        match (user, verified) {
            (Some(user), Ok(true)) => Ok(Some(user)),
            (Some(user), Err(e)) => {
                warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                Ok(None)
            }
            _ => {
                debug!("Credential check failed");
                Ok(None)
            }
        }
    }

    /// Tasks owned by a board
    async fn list_tasks_for_board(&self, board_id: Uuid) -> StoreResult<Vec<Task>> {
        self.list_tasks(TaskFilter::for_board(board_id)).await
    }

    /// Tasks whose assignee set contains `user_id`
    async fn list_tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        self.list_tasks(TaskFilter::for_assignee(user_id)).await
    }

    /// Aggregates the filtered task set, fresh on every call
    async fn dashboard(&self, filter: TaskFilter) -> StoreResult<Dashboard> {
        let tasks = self.list_tasks(filter).await?;
        Ok(Dashboard::from_tasks(&tasks))
    }
}

/// Returns the first id in `wanted` that is not in `members`
pub(crate) fn first_non_member(wanted: &[Uuid], members: &[Uuid]) -> Option<Uuid> {
    wanted.iter().copied().find(|id| !members.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_non_member() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(first_non_member(&[a, b], &[a, b, c]), None);
        assert_eq!(first_non_member(&[a, c], &[a, b]), Some(c));
        assert_eq!(first_non_member(&[], &[a]), None);
    }
}
