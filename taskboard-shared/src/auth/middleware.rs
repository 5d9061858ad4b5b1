/// Bearer-token resolution for Axum
///
/// [`resolve`] turns a bearer token into an [`AuthContext`]: it validates
/// the JWT and then loads the subject from the store, so a token whose user
/// no longer exists is rejected even while it is unexpired.
///
/// The HTTP layer runs this from its auth middleware and inserts the
/// resulting context into request extensions. Handlers take it as an
/// extractor argument.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::middleware::AuthContext;
///
/// async fn me(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.username)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::error::StoreError;
use crate::models::user::User;
use crate::store::Store;

/// Authenticated caller, present in request extensions behind the auth layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub username: String,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Errors from resolving a bearer token
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    Expired,

    /// Token is valid but its subject no longer resolves
    #[error("User not found")]
    UserNotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AuthError::Store(StoreError::Unavailable(_)) => (StatusCode::BAD_GATEWAY, "store_unavailable"),
            AuthError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            _ => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };
        let message = match &self {
            AuthError::Store(_) => "Authentication could not be completed".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Empty bearer token".to_string()));
    }

    Ok(token)
}

/// Validates `token` and loads its subject
///
/// # Errors
///
/// - `Expired` / `InvalidToken` when the JWT does not validate
/// - `UserNotFound` when the subject is not an existing user
/// - `Store` when the lookup itself fails
pub async fn resolve(store: &dyn Store, secret: &str, token: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthError::from(e)
    })?;
    let user_id = claims.user_id()?;

    let user = store.find_user_by_id(user_id).await?.ok_or_else(|| {
        warn!(%user_id, "Token subject does not resolve to a user");
        AuthError::UserNotFound
    })?;

    Ok(AuthContext::from_user(&user))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, issue_token, Claims};
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "middleware-test-secret-32-bytes-long!!";

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(CreateUser {
                username: "ada".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                photo: None,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingCredentials)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[tokio::test]
    async fn test_resolve_valid_token() {
        let (store, user) = store_with_user().await;
        let token = issue_token(user.id, &user.email, SECRET, 60).unwrap();

        let ctx = resolve(&store, SECRET, &token).await.unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.username, "ada");
    }

    #[tokio::test]
    async fn test_resolve_unknown_user() {
        let (store, _) = store_with_user().await;
        let token = issue_token(Uuid::new_v4(), "ghost@example.com", SECRET, 60).unwrap();

        assert!(matches!(
            resolve(&store, SECRET, &token).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_resolve_expired_token() {
        let (store, user) = store_with_user().await;
        let claims = Claims::new(user.id, &user.email, Duration::seconds(-3600));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(
            resolve(&store, SECRET, &token).await,
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::UserNotFound.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Store(StoreError::Unavailable("down".to_string()))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
