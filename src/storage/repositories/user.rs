//! User repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::auth::models::User;
use crate::domain::{CompanyId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for users.
#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: UserId,
    company_id: CompanyId,
    name: String,
    role: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            role: row.role,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository trait for user rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        name: &str,
        role: &str,
        email: &str,
    ) -> Result<User>;

    async fn find_by_id(&self, conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>>;

    async fn find_by_email(
        &self,
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<Option<User>>;

    /// Update name and role; returns None when the row no longer exists.
    async fn update_profile(
        &self,
        conn: &mut SqliteConnection,
        id: UserId,
        name: &str,
        role: &str,
    ) -> Result<Option<User>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: UserId) -> Result<bool>;
}

/// SQLx-based user repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxUserRepository;

impl SqlxUserRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, conn), fields(company_id = %company_id, email = %email))]
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        name: &str,
        role: &str,
        email: &str,
    ) -> Result<User> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (company_id, name, role, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, company_id, name, role, email, created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(role)
        .bind(email)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(
                    format!("email '{}' is already registered", email),
                    "user",
                )
            } else {
                AnteroomError::database(e, "Failed to insert user")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn), fields(user_id = %id))]
    async fn find_by_id(&self, conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, company_id, name, role, email, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get user"))?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self, conn), fields(email = %email))]
    async fn find_by_email(
        &self,
        conn: &mut SqliteConnection,
        email: &str,
    ) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, company_id, name, role, email, created_at, updated_at \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get user by email"))?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self, conn), fields(user_id = %id))]
    async fn update_profile(
        &self,
        conn: &mut SqliteConnection,
        id: UserId,
        name: &str,
        role: &str,
    ) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET name = $2, role = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, company_id, name, role, email, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(role)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to update user"))?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self, conn), fields(user_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete user"))?;

        Ok(result.rows_affected() > 0)
    }
}
