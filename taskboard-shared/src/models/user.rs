/// User model and database operations
///
/// Users are the identity records behind every board and task. Username and
/// email are each globally unique; the password is only ever stored as an
/// Argon2id PHC string.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY,
///     username VARCHAR(50) NOT NULL CONSTRAINT users_username_key UNIQUE,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     email CITEXT NOT NULL CONSTRAINT users_email_key UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     photo VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::insert(&pool, CreateUser {
///     username: "ada".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     photo: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ada@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

const USER_COLUMNS: &str = "id, username, first_name, last_name, email, password_hash, photo, \
                            created_at, updated_at, last_login_at";

/// User account
///
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login handle, unique across all users
    pub username: String,

    pub first_name: String,

    pub last_name: String,

    /// Email address, unique (case-insensitive)
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional display photo reference (URL or storage key)
    pub photo: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for inserting a user row
///
/// Carries the already-hashed password. Plaintext never reaches the store.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,
    pub photo: Option<String>,
}

/// Signup input as submitted by a client
///
/// Call [`RegisterUser::normalized`] first, then validate with `validator`
/// before the password is hashed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 512, message = "Photo reference must be at most 512 characters"))]
    pub photo: Option<String>,
}

impl RegisterUser {
    /// Trims the username and email, the two fields stored as identities
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self
        }
    }
}

impl User {
    /// Display name built from first and last name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_username_key` or
    /// `users_email_key` when the identity is taken.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (id, username, first_name, last_name, email, password_hash, photo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(data.username)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.photo)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by email, ignoring case
    ///
    /// The parameter must be cast to `citext`; compared as `text` the match
    /// is case-sensitive.
    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1::citext");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by username
    pub async fn find_by_username<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(executor)
            .await
    }

    /// Finds every user whose id is in `ids`, in username order
    pub async fn find_many<'e, E: PgExecutor<'e>>(
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY username ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(executor)
            .await
    }

    /// Stamps `last_login_at`; returns false when the user is gone
    pub async fn update_last_login<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists users with pagination, oldest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            photo: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ada");
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_full_name() {
        assert_eq!(sample_user().full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_register_user_validation() {
        let valid = RegisterUser {
            username: "ada".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "password123".to_string(),
            photo: None,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterUser {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let short_password = RegisterUser {
            password: "short".to_string(),
            ..valid.clone()
        };
        let errors = short_password.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let short_username = RegisterUser {
            username: "ab".to_string(),
            ..valid
        };
        assert!(short_username.validate().is_err());
    }

    #[test]
    fn test_register_user_normalized_before_validation() {
        let padded = RegisterUser {
            username: "  ab  ".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: " ada@example.com ".to_string(),
            password: "password123".to_string(),
            photo: None,
        };
        assert!(padded.validate().is_ok());

        let normalized = padded.normalized();
        assert_eq!(normalized.username, "ab");
        assert_eq!(normalized.email, "ada@example.com");
        let errors = normalized.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }
}
