/// PostgreSQL store
///
/// Composes the model-level SQL into transactional operations. Relational
/// constraints back up the application checks:
///
/// - `group_members` primary key: no duplicate members
/// - `task_assignees (board_id, user_id) → group_members`: an assignee is
///   always a member of the task's board, and deleting a membership
///   cascades to its assignments
/// - `tasks.board_id → groups ON DELETE CASCADE`: deleting a group deletes
///   its tasks
///
/// Every operation runs under `tokio::time::timeout`; when it expires the
/// in-flight transaction is dropped (and rolled back) and the caller gets
/// `StoreError::Unavailable`.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::{PgStore, Store};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// }).await?;
///
/// let store = PgStore::new(pool, Duration::from_secs(5));
/// store.health_check().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{first_non_member, Store};
use crate::db::pool;
use crate::error::{StoreError, StoreResult};
use crate::models::group::Group;
use crate::models::task::{CreateTask, Task, TaskFilter, TaskPatch};
use crate::models::user::{CreateUser, User};

/// Default per-operation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `fut` under the store timeout
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Store operation timed out");
                Err(StoreError::Unavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        }
    }

    async fn group_or_not_found(&self, id: Uuid) -> StoreResult<Group> {
        Group::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::group_not_found(id))
    }

    async fn task_or_not_found(&self, id: Uuid) -> StoreResult<Task> {
        Task::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| StoreError::task_not_found(id))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.bounded("health_check", async {
            pool::health_check(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        self.bounded("create_user", async {
            let user = User::insert(&self.pool, data).await?;
            info!(user_id = %user.id, username = %user.username, "User created");
            Ok(user)
        })
        .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.bounded("find_user_by_id", async {
            Ok(User::find_by_id(&self.pool, id).await?)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.bounded("find_user_by_email", async {
            Ok(User::find_by_email(&self.pool, email).await?)
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.bounded("find_user_by_username", async {
            Ok(User::find_by_username(&self.pool, username).await?)
        })
        .await
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        self.bounded("find_users", async {
            Ok(User::find_many(&self.pool, ids).await?)
        })
        .await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        self.bounded("list_users", async {
            Ok(User::list(&self.pool, limit.max(0), offset.max(0)).await?)
        })
        .await
    }

    async fn record_login(&self, user_id: Uuid) -> StoreResult<()> {
        self.bounded("record_login", async {
            if !User::update_last_login(&self.pool, user_id).await? {
                return Err(StoreError::user_not_found(user_id));
            }
            Ok(())
        })
        .await
    }

    async fn create_group(&self, name: &str, creator_id: Uuid) -> StoreResult<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("name", "must not be empty"));
        }

        self.bounded("create_group", async {
            let mut tx = self.pool.begin().await?;

            if User::find_by_id(&mut *tx, creator_id).await?.is_none() {
                return Err(StoreError::user_not_found(creator_id));
            }

            let id = Uuid::new_v4();
            Group::insert_row(&mut *tx, id, name, creator_id).await?;
            Group::insert_member(&mut *tx, id, creator_id).await?;
            let group = Group::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| StoreError::group_not_found(id))?;

            tx.commit().await?;

            info!(group_id = %id, %creator_id, "Group created");
            Ok(group)
        })
        .await
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        self.bounded("find_group", async {
            Ok(Group::find_by_id(&self.pool, id).await?)
        })
        .await
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Group>> {
        self.bounded("list_groups_for_user", async {
            Ok(Group::list_for_user(&self.pool, user_id).await?)
        })
        .await
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group> {
        self.bounded("add_member", async {
            let mut tx = self.pool.begin().await?;

            if Group::lock_creator(&mut *tx, group_id).await?.is_none() {
                return Err(StoreError::group_not_found(group_id));
            }
            if User::find_by_id(&mut *tx, user_id).await?.is_none() {
                return Err(StoreError::user_not_found(user_id));
            }
            if !Group::insert_member(&mut *tx, group_id, user_id).await? {
                return Err(StoreError::AlreadyMember { group_id, user_id });
            }

            tx.commit().await?;
            info!(%group_id, %user_id, "Member added");

            self.group_or_not_found(group_id).await
        })
        .await
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> StoreResult<Group> {
        self.bounded("remove_member", async {
            let mut tx = self.pool.begin().await?;

            let creator = Group::lock_creator(&mut *tx, group_id)
                .await?
                .ok_or_else(|| StoreError::group_not_found(group_id))?;
            if creator == user_id {
                warn!(%group_id, %user_id, "Refused to remove group creator");
                return Err(StoreError::CannotRemoveCreator(group_id));
            }

            // The membership FK would cascade these too; deleting them first
            // keeps the count for the log line.
            let unassigned = Task::delete_board_assignee(&mut *tx, group_id, user_id).await?;
            if !Group::delete_member(&mut *tx, group_id, user_id).await? {
                return Err(StoreError::NotAMember { group_id, user_id });
            }

            tx.commit().await?;
            info!(%group_id, %user_id, unassigned_tasks = unassigned, "Member removed");

            self.group_or_not_found(group_id).await
        })
        .await
    }

    async fn delete_group(&self, group_id: Uuid) -> StoreResult<()> {
        self.bounded("delete_group", async {
            if !Group::delete(&self.pool, group_id).await? {
                return Err(StoreError::group_not_found(group_id));
            }
            info!(%group_id, "Group deleted");
            Ok(())
        })
        .await
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        self.bounded("create_task", async {
            let mut tx = self.pool.begin().await?;

            if !Group::lock_shared(&mut *tx, data.board_id).await? {
                return Err(StoreError::board_not_found(data.board_id));
            }
            if !data.assigned_to.is_empty() {
                let members = Group::members_among(&mut *tx, data.board_id, &data.assigned_to).await?;
                if let Some(user_id) = first_non_member(&data.assigned_to, &members) {
                    warn!(board_id = %data.board_id, %user_id, "Initial assignee is not a board member");
                    return Err(StoreError::AssigneeNotBoardMember {
                        board_id: data.board_id,
                        user_id,
                    });
                }
            }

            let id = Uuid::new_v4();
            Task::insert_row(&mut *tx, id, &data).await?;
            Task::replace_assignees(&mut tx, id, data.board_id, &data.assigned_to).await?;
            let task = Task::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| StoreError::task_not_found(id))?;

            tx.commit().await?;

            info!(task_id = %id, board_id = %data.board_id, "Task created");
            Ok(task)
        })
        .await
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        self.bounded("find_task", async {
            Ok(Task::find_by_id(&self.pool, id).await?)
        })
        .await
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Task> {
        self.bounded("update_task", async {
            let mut tx = self.pool.begin().await?;

            let board_id = Task::lock_board(&mut *tx, id)
                .await?
                .ok_or_else(|| StoreError::task_not_found(id))?;

            if let Some(assigned_to) = &patch.assigned_to {
                // Blocks concurrent member removal until commit
                Group::lock_shared(&mut *tx, board_id).await?;
                let members = Group::members_among(&mut *tx, board_id, assigned_to).await?;
                if let Some(user_id) = first_non_member(assigned_to, &members) {
                    warn!(task_id = %id, %board_id, %user_id, "Assignee is not a board member");
                    return Err(StoreError::AssigneeNotBoardMember { board_id, user_id });
                }
            }

            Task::update_row(&mut tx, id, &patch).await?;
            if let Some(assigned_to) = &patch.assigned_to {
                Task::replace_assignees(&mut tx, id, board_id, assigned_to).await?;
            }
            let task = Task::find_by_id(&mut *tx, id)
                .await?
                .ok_or_else(|| StoreError::task_not_found(id))?;

            tx.commit().await?;

            info!(task_id = %id, "Task updated");
            Ok(task)
        })
        .await
    }

    async fn assign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task> {
        self.bounded("assign_user", async {
            let inserted = Task::insert_member_assignee(&self.pool, task_id, user_id).await?;
            let task = self.task_or_not_found(task_id).await?;

            if inserted {
                info!(%task_id, %user_id, "User assigned");
            } else if task.is_assigned_to(user_id) {
                debug!(%task_id, %user_id, "User already assigned");
            } else {
                warn!(%task_id, board_id = %task.board_id, %user_id, "Assignee is not a board member");
                return Err(StoreError::AssigneeNotBoardMember {
                    board_id: task.board_id,
                    user_id,
                });
            }

            Ok(task)
        })
        .await
    }

    async fn unassign_user(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<Task> {
        self.bounded("unassign_user", async {
            if Task::delete_assignee(&self.pool, task_id, user_id).await? {
                info!(%task_id, %user_id, "User unassigned");
            }
            self.task_or_not_found(task_id).await
        })
        .await
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<()> {
        self.bounded("delete_task", async {
            if !Task::delete(&self.pool, id).await? {
                return Err(StoreError::task_not_found(id));
            }
            info!(task_id = %id, "Task deleted");
            Ok(())
        })
        .await
    }

    async fn list_tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        self.bounded("list_tasks", async {
            let tasks = Task::list(&self.pool, &filter).await?;
            debug!(?filter, count = tasks.len(), "Listed tasks");
            Ok(tasks)
        })
        .await
    }
}
