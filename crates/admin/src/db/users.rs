//! Customer and staff accounts as seen from the back office.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use mytechgear_core::{Email, UserId, UserRole};

use super::{RepositoryError, expect_rows};
use crate::services::gate::RoleSource;

/// A user with their role and order count.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserListItem {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: UserId,
    email: String,
    password_hash: Option<String>,
}

/// Stored credentials for a staff login attempt.
#[derive(Debug, Clone)]
pub struct StaffCredentials {
    pub id: UserId,
    pub email: Email,
    pub password_hash: Option<String>,
}

/// Repository for account and role administration.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserListItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserListItem>(
            r"
            SELECT u.id, u.email, get_user_role(u.id) AS role,
                   p.first_name, p.last_name,
                   (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id) AS order_count,
                   u.created_at
            FROM users u
            LEFT JOIN profiles p ON p.user_id = u.id
            ORDER BY u.created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Role of a user; users without a role row are customers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get_role(&self, id: UserId) -> Result<UserRole, RepositoryError> {
        let role: UserRole = sqlx::query_scalar("SELECT get_user_role($1)")
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        Ok(role)
    }

    /// Grant or revoke a role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    #[instrument(skip(self))]
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role, updated_at)
            SELECT id, $2, NOW() FROM users WHERE id = $1
            ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            ",
        )
        .bind(id)
        .bind(role)
        .execute(self.pool)
        .await?;
        expect_rows(result.rows_affected())
    }

    /// Look up a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StaffCredentials>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT u.id, u.email, p.password_hash
            FROM users u
            LEFT JOIN user_passwords p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Some(StaffCredentials {
            id: row.id,
            email,
            password_hash: row.password_hash,
        }))
    }
}

/// [`RoleSource`] backed by `get_user_role()`.
#[derive(Clone)]
pub struct PgRoleSource {
    pool: PgPool,
}

impl PgRoleSource {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RoleSource for PgRoleSource {
    async fn role_of(&self, user: UserId) -> Result<UserRole, String> {
        UserRepository::new(&self.pool)
            .get_role(user)
            .await
            .map_err(|e| e.to_string())
    }
}
