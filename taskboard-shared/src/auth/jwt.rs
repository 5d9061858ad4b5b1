/// JWT bearer token issuance and validation
///
/// Tokens are HS256-signed and bound to the user's id as subject. There is
/// a single token type with a fixed lifetime; no refresh flow exists.
///
/// # Claims
///
/// - `sub`: user id (required, never empty)
/// - `email`: user email at issuance time
/// - `iss`: always `"taskboard"`
/// - `iat` / `nbf`: issuance time
/// - `exp`: expiry (default 60 minutes after issuance)
///
/// # Secret
///
/// The signing secret is supplied by the caller from configuration and
/// should be at least 32 bytes.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, "ada@example.com", Duration::minutes(60));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.user_id()?, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim for every token
pub const ISSUER: &str = "taskboard";

/// Default token lifetime in minutes
pub const DEFAULT_EXPIRY_MINUTES: i64 = 60;

/// Errors from creating or validating a token
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Claims have no subject; refused at issuance and at validation
    #[error("Token subject is missing")]
    MissingSubject,

    /// Subject is present but not a user id
    #[error("Token subject is not a valid user id: {0}")]
    InvalidSubject(String),

    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Bad signature, malformed token, or premature use
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id as a string; defaults to empty so an absent
    /// subject is reported as `MissingSubject`
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub email: String,

    pub iss: String,

    pub iat: i64,

    pub nbf: i64,

    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` expiring `expires_in` from now
    pub fn new(user_id: Uuid, email: impl Into<String>, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    /// Parses the subject back into a user id
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        if self.sub.trim().is_empty() {
            return Err(JwtError::MissingSubject);
        }
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject(self.sub.clone()))
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Seconds until expiry, or zero when already expired
    pub fn expires_in_seconds(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

/// Signs claims into a token
///
/// # Errors
///
/// `JwtError::MissingSubject` when `claims.sub` is empty, so a token that
/// could never resolve to a user is never handed out.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if claims.sub.trim().is_empty() {
        return Err(JwtError::MissingSubject);
    }

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a token for a user with the given lifetime in minutes
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
    expiry_minutes: i64,
) -> Result<String, JwtError> {
    let claims = Claims::new(user_id, email, Duration::minutes(expiry_minutes));
    create_token(&claims, secret)
}

/// Validates signature, issuer, expiry and subject, returning the claims
///
/// # Errors
///
/// - `Expired` once `exp` has passed
/// - `MissingSubject` when `sub` is absent or empty
/// - `InvalidIssuer` when `iss` is not `"taskboard"`
/// - `Invalid` for anything else (bad signature, malformed token)
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["sub", "exp", "iss"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    // A token is expired the second `exp` passes
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => JwtError::MissingSubject,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    let claims = token_data.claims;
    if claims.sub.trim().is_empty() {
        return Err(JwtError::MissingSubject);
    }

    Ok(claims)
}
