/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; domain errors convert into it
/// with `?`.
///
/// # Status Mapping
///
/// | Source | Status |
/// |--------|--------|
/// | malformed id, enum value, deadline, body | 400 |
/// | `validator` field errors | 422 |
/// | missing/invalid/expired token, bad credentials | 401 |
/// | caller not a board member / not the creator | 403 |
/// | missing user, group, or task | 404 |
/// | duplicate identity, already a member | 409 |
/// | membership/assignment invariant | 400 |
/// | store unreachable or timed out | 502 |
/// | anything else | 500 |
///
/// Store failures are logged and answered with a generic message.
///
/// # Example
///
/// ```
/// use taskboard_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("task not found".to_string()))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::{
    auth::{authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError},
    error::StoreError,
};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Membership or assignment rule violated (400)
    InvariantViolation(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Backing store unreachable (502)
    StoreUnavailable(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvariantViolation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StoreUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InvariantViolation(msg) => write!(f, "Invariant violation: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::StoreUnavailable(msg) => write!(f, "Store unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (error_code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::InvariantViolation(msg) => ("invariant_violation", msg, None),
            ApiError::ValidationError(errors) => (
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (
                    "store_unavailable",
                    "The data store is temporarily unavailable".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                // Logged only; clients get a generic message
                tracing::error!("Internal error: {}", msg);
                (
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation { .. } | StoreError::InvalidDeadlineFormat(_) => {
                ApiError::BadRequest(err.to_string())
            }
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::DuplicateIdentity { .. } | StoreError::AlreadyMember { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::NotAMember { .. }
            | StoreError::CannotRemoveCreator(_)
            | StoreError::AssigneeNotBoardMember { .. } => {
                ApiError::InvariantViolation(err.to_string())
            }
            StoreError::Unavailable(msg) => ApiError::StoreUnavailable(msg),
            StoreError::Database(msg) => ApiError::InternalError(format!("Database error: {}", msg)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(store_err) => store_err.into(),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) | AuthzError::NotCreator(_) => {
                ApiError::Forbidden(err.to_string())
            }
            AuthzError::Store(store_err) => store_err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Token creation failed: {}", msg))
            }
            JwtError::MissingSubject => ApiError::InternalError(err.to_string()),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert `validator` field errors to a 422 with one detail per message
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use validator::Validate;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_store_error_mapping() {
        let (g, u) = (Uuid::new_v4(), Uuid::new_v4());
        let cases = [
            (StoreError::validation("board_id", "bad"), StatusCode::BAD_REQUEST),
            (StoreError::InvalidDeadlineFormat("31/12/2025".into()), StatusCode::BAD_REQUEST),
            (StoreError::task_not_found(g), StatusCode::NOT_FOUND),
            (StoreError::DuplicateIdentity { field: "email" }, StatusCode::CONFLICT),
            (StoreError::AlreadyMember { group_id: g, user_id: u }, StatusCode::CONFLICT),
            (StoreError::CannotRemoveCreator(g), StatusCode::BAD_REQUEST),
            (
                StoreError::AssigneeNotBoardMember { board_id: g, user_id: u },
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::Unavailable("timeout".into()), StatusCode::BAD_GATEWAY),
            (StoreError::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (store_err, expected) in cases {
            let api_err: ApiError = store_err.into();
            assert_eq!(api_err.status(), expected, "{}", api_err);
        }
    }

    #[test]
    fn test_auth_and_authz_mapping() {
        let err: ApiError = AuthError::MissingCredentials.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::UserNotFound.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::Store(StoreError::Unavailable("down".into())).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let err: ApiError = AuthzError::NotMember(Uuid::new_v4()).into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err: ApiError = AuthzError::Store(StoreError::group_not_found(Uuid::new_v4())).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_errors_become_details() {
        #[derive(Validate)]
        struct Input {
            #[validate(length(min = 3, message = "too short"))]
            name: String,
            #[validate(email(message = "bad email"))]
            email: String,
        }

        let errors = Input {
            name: "x".into(),
            email: "nope".into(),
        }
        .validate()
        .unwrap_err();

        match ApiError::from(errors) {
            ApiError::ValidationError(details) => {
                assert_eq!(
                    details,
                    vec![
                        ValidationErrorDetail {
                            field: "email".into(),
                            message: "bad email".into()
                        },
                        ValidationErrorDetail {
                            field: "name".into(),
                            message: "too short".into()
                        },
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_internal_message_not_leaked() {
        let response = ApiError::InternalError("password=hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
