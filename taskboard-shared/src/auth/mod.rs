/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: HS256 bearer token issuance and validation
/// - [`middleware`]: Bearer token resolution and the `AuthContext` extractor
/// - [`authorization`]: Board membership and creator checks
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::{issue_token, validate_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let token = issue_token(Uuid::new_v4(), "user@example.com", secret, 60)?;
/// let claims = validate_token(&token, secret)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
