//! Credential repository: salted password hashes keyed by subject.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::auth::models::CredentialRecord;
use crate::domain::{CompanyId, CredentialId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for credentials.
#[derive(Debug, Clone, FromRow)]
struct CredentialRow {
    id: CredentialId,
    user_id: Option<UserId>,
    company_id: Option<CompanyId>,
    salt: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CredentialRow> for CredentialRecord {
    fn from(row: CredentialRow) -> Self {
        CredentialRecord {
            id: row.id,
            user_id: row.user_id,
            company_id: row.company_id,
            salt: row.salt,
            hashed_password: row.hashed_password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, company_id, salt, hashed_password, created_at, updated_at";

/// Repository trait for credential rows.
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    async fn insert_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<CredentialRecord>;

    async fn insert_for_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<CredentialRecord>;

    async fn find_by_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
    ) -> Result<Option<CredentialRecord>>;

    async fn find_by_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
    ) -> Result<Option<CredentialRecord>>;

    /// Replace salt and hash; returns None when the row no longer exists.
    async fn update_hash(
        &self,
        conn: &mut SqliteConnection,
        id: CredentialId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<Option<CredentialRecord>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: CredentialId) -> Result<bool>;
}

/// SQLx-based credential repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxCredentialRepository;

impl SqlxCredentialRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialRepository for SqlxCredentialRepository {
    #[instrument(skip(self, conn, salt, hashed_password), fields(user_id = %user_id))]
    async fn insert_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<CredentialRecord> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "INSERT INTO credentials (user_id, salt, hashed_password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SELECT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(salt)
        .bind(hashed_password)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(
                    format!("user {} already has a credential", user_id),
                    "credential",
                )
            } else {
                AnteroomError::database(e, "Failed to insert user credential")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn, salt, hashed_password), fields(company_id = %company_id))]
    async fn insert_for_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<CredentialRecord> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "INSERT INTO credentials (company_id, salt, hashed_password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {SELECT_COLUMNS}"
        ))
        .bind(company_id)
        .bind(salt)
        .bind(hashed_password)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(
                    format!("company {} already has a credential", company_id),
                    "credential",
                )
            } else {
                AnteroomError::database(e, "Failed to insert company credential")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn), fields(user_id = %user_id))]
    async fn find_by_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
    ) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get user credential"))?;

        Ok(row.map(CredentialRecord::from))
    }

    #[instrument(skip(self, conn), fields(company_id = %company_id))]
    async fn find_by_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
    ) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM credentials WHERE company_id = $1"
        ))
        .bind(company_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get company credential"))?;

        Ok(row.map(CredentialRecord::from))
    }

    #[instrument(skip(self, conn, salt, hashed_password), fields(credential_id = %id))]
    async fn update_hash(
        &self,
        conn: &mut SqliteConnection,
        id: CredentialId,
        salt: &str,
        hashed_password: &str,
    ) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "UPDATE credentials SET salt = $2, hashed_password = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(salt)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to update credential"))?;

        Ok(row.map(CredentialRecord::from))
    }

    #[instrument(skip(self, conn), fields(credential_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: CredentialId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete credential"))?;

        Ok(result.rows_affected() > 0)
    }
}
