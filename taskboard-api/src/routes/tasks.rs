/// Task endpoints
///
/// A task lives on one board for its whole life. Reading or changing it
/// requires membership of that board, and every assignee must be a member
/// of it when assigned.
///
/// # Endpoints
///
/// - `GET /api/tasks/` - Tasks on the caller's boards (`?board_id=&deadline_before=`)
/// - `POST /api/tasks/` - Create a task
/// - `GET /api/tasks/dashboard` - Dashboard (`?board_id=`)
/// - `GET /api/tasks/user/:user_id` - Tasks assigned to a user
/// - `GET /api/tasks/:id` - One task
/// - `PATCH /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete
/// - `PATCH /api/tasks/:id/assign` - Assign a board member
/// - `PATCH /api/tasks/:id/unassign` - Unassign a user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::MessageResponse,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{require_membership, require_task_access},
        middleware::AuthContext,
    },
    models::{
        dashboard::Dashboard,
        parse_id,
        task::{parse_deadline, NewTask, Task, TaskFilter, UpdateTask},
    },
};
use tracing::info;

/// Query parameters of `GET /api/tasks/`
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Restrict to one board
    pub board_id: Option<String>,

    /// Only tasks due on or before this date (`YYYY-MM-DD`)
    pub deadline_before: Option<String>,
}

/// Query parameters of `GET /api/tasks/dashboard`
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub board_id: Option<String>,
}

/// Body of the assign and unassign routes
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: String,
}

/// Scopes a filter to one board the caller belongs to, or to all of them
async fn scoped_filter(
    state: &AppState,
    auth: &AuthContext,
    board_id: Option<&str>,
) -> ApiResult<TaskFilter> {
    match board_id.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let board_id = parse_id("board_id", raw)?;
            require_membership(state.store.as_ref(), board_id, auth.user_id).await?;
            Ok(TaskFilter::for_board(board_id))
        }
        None => Ok(TaskFilter {
            member_id: Some(auth.user_id),
            ..Default::default()
        }),
    }
}

/// Lists tasks visible to the caller
///
/// # Errors
///
/// - `400 Bad Request`: Malformed `board_id` or `deadline_before`
/// - `403 Forbidden`: `board_id` names a board the caller is not on
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(query) = query?;

    let mut filter = scoped_filter(&state, &auth, query.board_id.as_deref()).await?;
    filter.deadline_before = query
        .deadline_before
        .as_deref()
        .map(parse_deadline)
        .transpose()?;

    let tasks = state.store.list_tasks(filter).await?;
    Ok(Json(tasks))
}

/// Creates a task on a board the caller belongs to
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks/
/// Content-Type: application/json
///
/// {
///   "board_id": "uuid",
///   "title": "Write launch notes",
///   "status": "not_started",
///   "priority": "high",
///   "deadline": "2025-12-31",
///   "assigned_to": ["uuid"]
/// }
/// ```
///
/// `status`, `priority`, `description`, `deadline`, and `assigned_to` are
/// optional.
///
/// # Errors
///
/// - `400 Bad Request`: Bad id, title, enum value, deadline, or an assignee
///   who is not a board member
/// - `403 Forbidden`: Caller is not on the board
/// - `404 Not Found`: Board does not exist
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = payload?;
    let data = req.into_create(auth.user_id)?;

    require_membership(state.store.as_ref(), data.board_id, auth.user_id).await?;

    let task = state.store.create_task(data).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Dashboard over one board, or over every board the caller belongs to
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Json<Dashboard>> {
    let Query(query) = query?;

    let filter = scoped_filter(&state, &auth, query.board_id.as_deref()).await?;
    let dashboard = state.store.dashboard(filter).await?;

    Ok(Json(dashboard))
}

/// Tasks assigned to `user_id`, limited to boards the caller belongs to
pub async fn list_user_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let user_id = parse_id("user_id", &user_id)?;

    if state.store.find_user_by_id(user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", user_id)));
    }

    let tasks = state
        .store
        .list_tasks(TaskFilter {
            member_id: Some(auth.user_id),
            assignee_id: Some(user_id),
            ..Default::default()
        })
        .await?;

    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id("task_id", &id)?;
    let task = require_task_access(state.store.as_ref(), task_id, auth.user_id).await?;
    Ok(Json(task))
}

/// Applies a partial update
///
/// Absent fields stay as they are; `null` clears `description` or
/// `deadline`; `assigned_to` replaces the assignee set.
///
/// # Errors
///
/// - `400 Bad Request`: Empty patch, malformed field, or an assignee who is
///   not a board member (nothing is written)
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTask>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id("task_id", &id)?;
    let Json(req) = payload?;
    let patch = req.into_patch()?;

    require_task_access(state.store.as_ref(), task_id, auth.user_id).await?;

    let task = state.store.update_task(task_id, patch).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let task_id = parse_id("task_id", &id)?;
    require_task_access(state.store.as_ref(), task_id, auth.user_id).await?;

    state.store.delete_task(task_id).await?;
    info!(%task_id, deleted_by = %auth.user_id, "Task deleted");

    Ok(Json(MessageResponse::new(format!("Task {} deleted", task_id))))
}

/// Assigns a board member; assigning someone twice changes nothing
pub async fn assign_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id("task_id", &id)?;
    let Json(req) = payload?;
    let user_id = parse_id("user_id", &req.user_id)?;

    require_task_access(state.store.as_ref(), task_id, auth.user_id).await?;

    let task = state.store.assign_user(task_id, user_id).await?;
    Ok(Json(task))
}

/// Unassigns a user; unassigning someone not assigned changes nothing
pub async fn unassign_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let task_id = parse_id("task_id", &id)?;
    let Json(req) = payload?;
    let user_id = parse_id("user_id", &req.user_id)?;

    require_task_access(state.store.as_ref(), task_id, auth.user_id).await?;

    let task = state.store.unassign_user(task_id, user_id).await?;
    Ok(Json(task))
}
