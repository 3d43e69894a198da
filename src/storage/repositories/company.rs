//! Company repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::auth::models::Company;
use crate::domain::CompanyId;
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for companies.
#[derive(Debug, Clone, FromRow)]
struct CompanyRow {
    id: CompanyId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository trait for company rows.
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn insert(&self, conn: &mut SqliteConnection, name: &str) -> Result<Company>;

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: CompanyId,
    ) -> Result<Option<Company>>;

    async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Company>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: CompanyId) -> Result<bool>;
}

/// SQLx-based company repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxCompanyRepository;

impl SqlxCompanyRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompanyRepository for SqlxCompanyRepository {
    #[instrument(skip(self, conn), fields(name = %name))]
    async fn insert(&self, conn: &mut SqliteConnection, name: &str) -> Result<Company> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, CompanyRow>(
            r#"
            INSERT INTO companies (name, created_at, updated_at)
            VALUES ($1, $2, $3)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(
                    format!("company name '{}' is already registered", name),
                    "company",
                )
            } else {
                AnteroomError::database(e, "Failed to insert company")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn), fields(company_id = %id))]
    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: CompanyId,
    ) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, created_at, updated_at FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get company"))?;

        Ok(row.map(Company::from))
    }

    #[instrument(skip(self, conn), fields(name = %name))]
    async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>(
            "SELECT id, name, created_at, updated_at FROM companies WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get company by name"))?;

        Ok(row.map(Company::from))
    }

    #[instrument(skip(self, conn), fields(company_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: CompanyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete company"))?;

        Ok(result.rows_affected() > 0)
    }
}
