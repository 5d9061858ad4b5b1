/// User endpoints
///
/// Signup and login are public and hand out bearer tokens; the rest need
/// one.
///
/// # Endpoints
///
/// - `POST /api/users/signup` - Register a new user
/// - `POST /api/users/login` - Exchange credentials for a token
/// - `GET /api/users/me` - Caller identity
/// - `GET /api/users/` - List users (`?limit=&offset=`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{jwt, middleware::AuthContext},
    models::user::{RegisterUser, User},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Largest page `GET /api/users/` returns
pub const MAX_PAGE_SIZE: i64 = 100;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Signup and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: Uuid,

    /// Bearer access token
    pub access_token: String,

    /// Always `"bearer"`
    pub token_type: String,

    /// Seconds until the token expires
    pub expires_in: i64,
}

/// Pagination for the user list
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

fn token_response(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    let expiry_minutes = state.config.jwt.expiry_minutes;
    let access_token = jwt::issue_token(user.id, &user.email, state.jwt_secret(), expiry_minutes)?;

    Ok(TokenResponse {
        user_id: user.id,
        access_token,
        token_type: "bearer".to_string(),
        expires_in: expiry_minutes * 60,
    })
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/users/signup
/// Content-Type: application/json
///
/// {
///   "username": "ada",
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "email": "ada@example.com",
///   "password": "analytical-engine",
///   "photo": null
/// }
/// ```
///
/// # Response
///
/// `201 Created` with a [`TokenResponse`].
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Username or email already exists
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    let Json(req) = payload?;
    let req = req.normalized();
    req.validate()?;

    let user = state.store.register_user(req).await?;
    info!(user_id = %user.id, username = %user.username, "User signed up");

    Ok((StatusCode::CREATED, Json(token_response(&state, &user)?)))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/users/login
/// Content-Type: application/json
///
/// {
///   "email": "ada@example.com",
///   "password": "analytical-engine"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = state
        .store
        .verify_credentials(&req.email, &req.password)
        .await?
        .ok_or_else(|| {
            warn!("Login rejected");
            ApiError::Unauthorized("Invalid email or password".to_string())
        })?;

    state.store.record_login(user.id).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(token_response(&state, &user)?))
}

/// Returns the authenticated caller's profile
pub async fn me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(user))
}

/// Lists users, oldest first
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<User>>> {
    let Query(query) = query?;

    if query.limit < 1 || query.offset < 0 {
        return Err(ApiError::BadRequest(
            "limit must be positive and offset non-negative".to_string(),
        ));
    }

    let users = state
        .store
        .list_users(query.limit.min(MAX_PAGE_SIZE), query.offset)
        .await?;

    Ok(Json(users))
}
