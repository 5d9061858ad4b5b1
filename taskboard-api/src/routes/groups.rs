/// Group ("board") endpoints
///
/// The creator of a group is its first member and stays a member for the
/// group's whole life. Every route here needs a bearer token and, except
/// for listing and creating, membership of the group.
///
/// # Endpoints
///
/// - `GET /api/groups/` - Groups the caller belongs to
/// - `POST /api/groups/` - Create a group
/// - `GET /api/groups/:id` - Group with member ids
/// - `DELETE /api/groups/:id` - Delete group and its tasks (creator only)
/// - `PATCH /api/groups/:id/add_user/:user_id` - Add a member
/// - `DELETE /api/groups/:id/remove_user/:user_id` - Remove a member
/// - `GET /api/groups/:id/users` - Member profiles
/// - `GET /api/groups/:id/tasks` - Tasks on the board
/// - `GET /api/groups/:id/dashboard` - Board dashboard

use crate::{app::AppState, error::ApiResult, routes::MessageResponse};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use taskboard_shared::{
    auth::{
        authorization::{can_remove_member, require_creator, require_membership},
        middleware::AuthContext,
    },
    models::{
        dashboard::Dashboard,
        group::{CreateGroup, Group},
        parse_id,
        task::{Task, TaskFilter},
        user::User,
    },
};
use tracing::info;
use validator::Validate;

/// Lists the caller's groups
pub async fn list_groups(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Group>>> {
    let groups = state.store.list_groups_for_user(auth.user_id).await?;
    Ok(Json(groups))
}

/// Creates a group with the caller as creator
///
/// # Endpoint
///
/// ```text
/// POST /api/groups/
/// Content-Type: application/json
///
/// { "name": "Launch" }
/// ```
///
/// # Response
///
/// `201 Created` with the group; `members` holds exactly the caller.
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CreateGroup>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let Json(req) = payload?;
    req.validate()?;

    let group = state.store.create_group(&req.name, auth.user_id).await?;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id("group_id", &id)?;
    let group = require_membership(state.store.as_ref(), group_id, auth.user_id).await?;
    Ok(Json(group))
}

/// Deletes a group and every task on it
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not the creator
/// - `404 Not Found`: No such group
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let group_id = parse_id("group_id", &id)?;
    require_creator(state.store.as_ref(), group_id, auth.user_id).await?;

    state.store.delete_group(group_id).await?;
    info!(%group_id, deleted_by = %auth.user_id, "Group deleted by creator");

    Ok(Json(MessageResponse::new(format!("Group {} deleted", group_id))))
}

/// Adds an existing user to the group
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member
/// - `404 Not Found`: Group or user does not exist
/// - `409 Conflict`: User is already a member
pub async fn add_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id("group_id", &id)?;
    let user_id = parse_id("user_id", &user_id)?;
    require_membership(state.store.as_ref(), group_id, auth.user_id).await?;

    let group = state.store.add_member(group_id, user_id).await?;
    Ok(Json(group))
}

/// Removes a member and unassigns them from the group's tasks
///
/// The creator may remove anyone but themself; other members may only
/// remove themselves.
///
/// # Errors
///
/// - `400 Bad Request`: Target is the creator or not a member
/// - `403 Forbidden`: Caller may not remove the target
pub async fn remove_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<Group>> {
    let group_id = parse_id("group_id", &id)?;
    let user_id = parse_id("user_id", &user_id)?;
    let group = require_membership(state.store.as_ref(), group_id, auth.user_id).await?;
    can_remove_member(&group, auth.user_id, user_id)?;

    let group = state.store.remove_member(group_id, user_id).await?;
    Ok(Json(group))
}

/// Member profiles, ordered by username
pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<User>>> {
    let group_id = parse_id("group_id", &id)?;
    let group = require_membership(state.store.as_ref(), group_id, auth.user_id).await?;

    let users = state.store.find_users(&group.members).await?;
    Ok(Json(users))
}

pub async fn list_group_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let group_id = parse_id("group_id", &id)?;
    require_membership(state.store.as_ref(), group_id, auth.user_id).await?;

    let tasks = state.store.list_tasks_for_board(group_id).await?;
    Ok(Json(tasks))
}

/// Dashboard over the group's tasks, computed on every call
pub async fn group_dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Dashboard>> {
    let group_id = parse_id("group_id", &id)?;
    require_membership(state.store.as_ref(), group_id, auth.user_id).await?;

    let dashboard = state.store.dashboard(TaskFilter::for_board(group_id)).await?;
    Ok(Json(dashboard))
}
