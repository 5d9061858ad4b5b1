/// Task model, validation, and database operations
///
/// A task belongs to exactly one board (group) for its whole life and is
/// assigned to zero or more users, each of whom must be a member of that
/// board when the assignment is made.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('not_started', 'in_progress', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     board_id UUID NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
///     created_by UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'not_started',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     deadline DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (id, board_id)
/// );
///
/// CREATE TABLE task_assignees (
///     task_id UUID NOT NULL,
///     board_id UUID NOT NULL,
///     user_id UUID NOT NULL,
///     assigned_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
///     PRIMARY KEY (task_id, user_id),
///     FOREIGN KEY (task_id, board_id) REFERENCES tasks(id, board_id) ON DELETE CASCADE,
///     FOREIGN KEY (board_id, user_id) REFERENCES group_members(group_id, user_id) ON DELETE CASCADE
/// );
/// ```
///
/// The second foreign key makes "assignee is a board member" a database
/// constraint, not just an application check.
///
/// # Example
///
/// ```
/// use taskboard_shared::models::task::{TaskStatus, UpdateTask};
///
/// let raw: UpdateTask = serde_json::from_str(r#"{"status": "done", "deadline": null}"#).unwrap();
/// let patch = raw.into_patch().unwrap();
/// assert_eq!(patch.status, Some(TaskStatus::Done));
/// assert_eq!(patch.deadline, Some(None)); // explicit null clears the deadline
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{PgConnection, PgExecutor};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::parse_id;
use crate::error::{StoreError, StoreResult};

/// Canonical deadline format
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 200;

const TASK_SELECT: &str = r#"
    SELECT t.id, t.board_id, t.created_by, t.title, t.description, t.status, t.priority,
           t.deadline, t.created_at, t.updated_at,
           COALESCE(
               array_agg(a.user_id ORDER BY a.assigned_at) FILTER (WHERE a.user_id IS NOT NULL),
               '{}'
           ) AS assigned_to
    FROM tasks t
    LEFT JOIN task_assignees a ON a.task_id = t.id
"#;

/// Task progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::NotStarted, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                StoreError::validation(
                    "status",
                    format!("'{}' is not one of not_started, in_progress, done", s),
                )
            })
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                StoreError::validation(
                    "priority",
                    format!("'{}' is not one of low, medium, high", s),
                )
            })
    }
}

/// Parses a deadline in the canonical `YYYY-MM-DD` format
///
/// # Errors
///
/// Returns `StoreError::InvalidDeadlineFormat` for anything else, including
/// unpadded months/days and timestamps.
pub fn parse_deadline(raw: &str) -> StoreResult<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return Err(StoreError::InvalidDeadlineFormat(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, DEADLINE_FORMAT)
        .map_err(|_| StoreError::InvalidDeadlineFormat(raw.to_string()))
}

/// Task with its assignee set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owning board; never changes after creation
    pub board_id: Uuid,

    pub created_by: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub status: TaskStatus,

    pub priority: TaskPriority,

    pub deadline: Option<NaiveDate>,

    /// Assignee ids in assignment order, each a board member
    pub assigned_to: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_assigned_to(&self, user_id: Uuid) -> bool {
        self.assigned_to.contains(&user_id)
    }
}

/// Validated input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub board_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub deadline: Option<NaiveDate>,
    /// Initial assignees; validated against the board's members by the store
    pub assigned_to: Vec<Uuid>,
}

/// Task creation body as submitted by a client
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTask {
    pub board_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub assigned_to: Vec<String>,
}

impl NewTask {
    /// Validates every field and produces the store input
    ///
    /// # Errors
    ///
    /// `Validation` for a bad id, title, status or priority;
    /// `InvalidDeadlineFormat` for a malformed deadline.
    pub fn into_create(self, created_by: Uuid) -> StoreResult<CreateTask> {
        let board_id = parse_id("board_id", &self.board_id)?;
        let title = validate_title(self.title)?;
        let status = self.status.as_deref().map(str::parse).transpose()?.unwrap_or_default();
        let priority = self
            .priority
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();
        let deadline = self.deadline.as_deref().map(parse_deadline).transpose()?;
        let assigned_to = parse_assignees(&self.assigned_to)?;

        Ok(CreateTask {
            board_id,
            created_by,
            title,
            description: self.description,
            status,
            priority,
            deadline,
            assigned_to,
        })
    }
}

/// Partial task update as submitted by a client
///
/// Absent fields are left untouched. For `description` and `deadline`, an
/// explicit `null` clears the value. `assigned_to` replaces the whole
/// assignee set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTask {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<String>>,
    #[serde(default)]
    pub assigned_to: Option<Vec<String>>,
}

impl UpdateTask {
    /// Validates every supplied field into a typed patch
    ///
    /// # Errors
    ///
    /// `Validation` when the patch is empty or a field is malformed;
    /// `InvalidDeadlineFormat` for a malformed deadline.
    pub fn into_patch(self) -> StoreResult<TaskPatch> {
        let patch = TaskPatch {
            title: self.title.map(validate_title).transpose()?,
            description: self.description,
            status: self.status.as_deref().map(str::parse).transpose()?,
            priority: self.priority.as_deref().map(str::parse).transpose()?,
            deadline: self
                .deadline
                .map(|d| d.as_deref().map(parse_deadline).transpose())
                .transpose()?,
            assigned_to: self
                .assigned_to
                .as_deref()
                .map(parse_assignees)
                .transpose()?,
        };

        if patch.is_empty() {
            return Err(StoreError::validation("body", "no fields to update"));
        }

        Ok(patch)
    }
}

/// Validated partial update, one optional slot per mutable field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<Option<NaiveDate>>,
    pub assigned_to: Option<Vec<Uuid>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
            && self.assigned_to.is_none()
    }

    /// True when a column of the `tasks` row changes
    pub fn touches_row(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.deadline.is_some()
    }

    /// Applies the patch to an in-memory task
    ///
    /// Assignee membership must already have been checked by the caller.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(assigned_to) = &self.assigned_to {
            task.assigned_to = assigned_to.clone();
        }
        task.updated_at = Utc::now();
    }
}

/// Task listing filter; all set conditions must hold
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskFilter {
    /// Only tasks on this board
    pub board_id: Option<Uuid>,

    /// Only tasks on boards this user is a member of
    pub member_id: Option<Uuid>,

    /// Only tasks assigned to this user
    pub assignee_id: Option<Uuid>,

    /// Only tasks with a deadline on or before this date
    pub deadline_before: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn for_board(board_id: Uuid) -> Self {
        Self {
            board_id: Some(board_id),
            ..Default::default()
        }
    }

    pub fn for_assignee(user_id: Uuid) -> Self {
        Self {
            assignee_id: Some(user_id),
            ..Default::default()
        }
    }

    /// Checks the task-local conditions; membership is resolved by the store
    pub fn matches_task(&self, task: &Task) -> bool {
        self.board_id.map_or(true, |id| task.board_id == id)
            && self.assignee_id.map_or(true, |id| task.is_assigned_to(id))
            && self
                .deadline_before
                .map_or(true, |limit| task.deadline.map_or(false, |d| d <= limit))
    }
}

fn validate_title(title: String) -> StoreResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::validation("title", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(StoreError::validation(
            "title",
            format!("must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(trimmed.to_string())
}

/// Parses assignee ids, dropping duplicates while keeping first-seen order
fn parse_assignees(raw: &[String]) -> StoreResult<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id = parse_id("assigned_to", value)?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Task {
    /// Inserts the task row (without assignees)
    pub async fn insert_row<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        data: &CreateTask,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, board_id, created_by, title, description, status, priority, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(data.board_id)
        .bind(data.created_by)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.deadline)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Finds a task with its assignees
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("{TASK_SELECT} WHERE t.id = $1 GROUP BY t.id");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Locks the task row and returns its board, or None if missing
    pub async fn lock_board<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT board_id FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Writes the row-level fields of a patch (everything but assignees)
    pub async fn update_row(
        conn: &mut PgConnection,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<bool, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if patch.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if patch.deadline.is_some() {
            bind_count += 1;
            query.push_str(&format!(", deadline = ${}", bind_count));
        }
        query.push_str(" WHERE id = $1");

        let mut q = sqlx::query(&query).bind(id);
        if let Some(title) = &patch.title {
            q = q.bind(title);
        }
        if let Some(description) = &patch.description {
            q = q.bind(description);
        }
        if let Some(status) = patch.status {
            q = q.bind(status);
        }
        if let Some(priority) = patch.priority {
            q = q.bind(priority);
        }
        if let Some(deadline) = patch.deadline {
            q = q.bind(deadline);
        }

        let result = q.execute(&mut *conn).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the whole assignee set of a task
    pub async fn replace_assignees(
        conn: &mut PgConnection,
        task_id: Uuid,
        board_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *conn)
            .await?;

        // One statement per row keeps `assigned_at` ordered like the input
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, board_id, user_id) VALUES ($1, $2, $3)",
            )
            .bind(task_id)
            .bind(board_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Assigns a user if, and only if, they are a member of the task's
    /// board; returns false when nothing was inserted (task missing, user
    /// not a member, or already assigned)
    pub async fn insert_member_assignee<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO task_assignees (task_id, board_id, user_id)
            SELECT t.id, t.board_id, m.user_id
            FROM tasks t
            JOIN group_members m ON m.group_id = t.board_id AND m.user_id = $2
            WHERE t.id = $1
            ON CONFLICT (task_id, user_id) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes one assignee; returns false when they were not assigned
    pub async fn delete_assignee<'e, E: PgExecutor<'e>>(
        executor: E,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_assignees WHERE task_id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unassigns a user from every task on a board; returns rows removed
    pub async fn delete_board_assignee<'e, E: PgExecutor<'e>>(
        executor: E,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_assignees WHERE board_id = $1 AND user_id = $2")
            .bind(board_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a task; assignments cascade
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks matching a filter, oldest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        filter: &TaskFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"{TASK_SELECT}
            WHERE ($1::uuid IS NULL OR t.board_id = $1)
              AND ($2::uuid IS NULL OR EXISTS (
                  SELECT 1 FROM group_members m WHERE m.group_id = t.board_id AND m.user_id = $2))
              AND ($3::uuid IS NULL OR EXISTS (
                  SELECT 1 FROM task_assignees x WHERE x.task_id = t.id AND x.user_id = $3))
              AND ($4::date IS NULL OR t.deadline <= $4)
            GROUP BY t.id
            ORDER BY t.created_at ASC"#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(filter.board_id)
            .bind(filter.member_id)
            .bind(filter.assignee_id)
            .bind(filter.deadline_before)
            .fetch_all(executor)
            .await
    }
}
