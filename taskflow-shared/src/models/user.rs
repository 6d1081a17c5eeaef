/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user accounts.
/// Users carry a role (user, manager, admin) that drives task visibility and the
/// authorization policy in `crate::auth::policy`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     is_email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     email_verification_token VARCHAR(64),
///     email_verification_expires TIMESTAMPTZ,
///     refresh_token TEXT,
///     avatar_url VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::user::{User, CreateUser, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
///     role: UserRole::User,
///     email_verification_token: None,
///     email_verification_expires: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "user@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User role controlling task visibility and administrative rights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular user: sees only tasks they created or are assigned to
    User,

    /// Manager: sees tasks they created plus any assigned task; may list users
    Manager,

    /// Administrator: unrestricted
    Admin,
}

impl UserRole {
    /// Converts role to string for logging and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }

    /// Manager or admin
    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Manager | UserRole::Admin)
    }
}

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. The refresh
/// token handle is persisted so it can be invalidated server-side on logout.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT, unique)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    /// Role driving the authorization policy
    pub role: UserRole,

    /// Deactivated accounts cannot authenticate
    pub is_active: bool,

    /// Set after the email verification flow completes
    pub is_email_verified: bool,

    /// Pending email verification token (hex), cleared on verification
    #[serde(skip_serializing)]
    pub email_verification_token: Option<String>,

    /// Expiry of the pending verification token
    #[serde(skip_serializing)]
    pub email_verification_expires: Option<DateTime<Utc>>,

    /// Currently valid refresh token handle (rotated on every refresh)
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,

    /// Optional avatar/profile picture URL
    pub avatar_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Full display name, used for assignment emails
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Public view of a user, safe to embed in API responses
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        UserSummary {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub role: UserRole,

    /// Verification token generated at registration
    pub email_verification_token: Option<String>,

    pub email_verification_expires: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, \
     is_active, is_email_verified, email_verification_token, \
     email_verification_expires, refresh_token, avatar_url, created_at, updated_at";

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error::Database` with a unique constraint violation when
    /// the email is already taken; callers map that to a conflict response.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role,
                               email_verification_token, email_verification_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.role)
        .bind(data.email_verification_token)
        .bind(data.email_verification_expires)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an active user by ID
    ///
    /// This is what the authentication middleware uses: a deactivated account
    /// must not resolve to an actor.
    pub async fn find_active_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active = TRUE"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds a user by email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by pending email verification token
    pub async fn find_by_verification_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email_verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Loads public summaries for a set of user IDs
    ///
    /// Used to stitch creator/assignee data onto task pages without N+1 queries.
    pub async fn find_summaries(
        pool: &PgPool,
        ids: &[Uuid],
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, email, first_name, last_name, role, is_active, avatar_url, created_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Lists all active users, newest first
    pub async fn list_active(pool: &PgPool) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, email, first_name, last_name, role, is_active, avatar_url, created_at
            FROM users
            WHERE is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Stores (or rotates) the refresh token handle
    pub async fn set_refresh_token(
        pool: &PgPool,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(refresh_token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Marks the email as verified and clears the pending token
    pub async fn mark_email_verified(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_email_verified = TRUE,
                email_verification_token = NULL,
                email_verification_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
