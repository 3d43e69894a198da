//! Company lifecycle, symmetric to user accounts: the company row and its
//! credential row move together in one transaction.

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::auth::credential_service::CredentialService;
use crate::auth::models::{Company, NewCompany};
use crate::domain::CompanyId;
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{CompanyRepository, SqlxCompanyRepository};
use crate::storage::DbPool;

/// Service for managing tenant companies.
#[derive(Clone)]
pub struct CompanyService {
    pool: DbPool,
    company_repo: Arc<dyn CompanyRepository>,
    credentials: Arc<CredentialService>,
}

impl CompanyService {
    pub fn new(
        pool: DbPool,
        company_repo: Arc<dyn CompanyRepository>,
        credentials: Arc<CredentialService>,
    ) -> Self {
        Self {
            pool,
            company_repo,
            credentials,
        }
    }

    pub fn with_sqlx(pool: DbPool, credentials: Arc<CredentialService>) -> Self {
        Self::new(pool, Arc::new(SqlxCompanyRepository::new()), credentials)
    }

    /// Register a company. Company names are a candidate key.
    #[instrument(skip(self, new_company), fields(name = %new_company.name))]
    pub async fn register(&self, new_company: NewCompany) -> Result<Company> {
        new_company.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        if self
            .company_repo
            .find_by_name(&mut tx, &new_company.name)
            .await?
            .is_some()
        {
            return Err(AnteroomError::duplicated(
                format!("company name '{}' is already registered", new_company.name),
                "company",
            ));
        }

        let company = self.company_repo.insert(&mut tx, &new_company.name).await?;

        self.credentials
            .save_for_company(&mut tx, company.id, &new_company.password)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit company registration"))?;

        info!(company_id = %company.id, name = %company.name, "company registered");
        Ok(company)
    }

    /// Fetch a company by id.
    pub async fn find_by_id(&self, company_id: CompanyId) -> Result<Company> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.company_repo
            .find_by_id(&mut conn, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", company_id))
    }

    /// Fetch a company by name.
    pub async fn find_by_name(&self, name: &str) -> Result<Company> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.company_repo
            .find_by_name(&mut conn, name)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", name))
    }

    /// Rotate a company's password.
    #[instrument(skip(self, password), fields(company_id = %company_id))]
    pub async fn update_password(&self, company_id: CompanyId, password: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.company_repo
            .find_by_id(&mut tx, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", company_id))?;

        self.credentials
            .update_company_password(&mut tx, company_id, password)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit password update"))?;

        info!(company_id = %company_id, "company password rotated");
        Ok(())
    }

    /// Remove a company and its credential row in one transaction.
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn remove(&self, company_id: CompanyId) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.company_repo
            .find_by_id(&mut tx, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", company_id))?;

        self.credentials
            .remove_for_company(&mut tx, company_id)
            .await?;

        if !self.company_repo.delete(&mut tx, company_id).await? {
            return Err(AnteroomError::not_removed(format!(
                "company {} could not be removed",
                company_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit company removal"))?;

        info!(company_id = %company_id, "company removed");
        Ok(true)
    }
}
