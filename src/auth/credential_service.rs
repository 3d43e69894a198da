//! Credential store: salted password hashes per subject.
//!
//! Creation, rotation and removal of credential rows always happen inside the
//! owning entity's transaction, so those methods take the caller's open
//! connection. The compare operations are self-contained reads.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::instrument;

use crate::auth::hashing;
use crate::auth::models::CredentialRecord;
use crate::domain::{CompanyId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{CredentialRepository, SqlxCredentialRepository};
use crate::storage::DbPool;

/// Service for managing subject credentials.
#[derive(Clone)]
pub struct CredentialService {
    pool: DbPool,
    credential_repo: Arc<dyn CredentialRepository>,
}

impl CredentialService {
    pub fn new(pool: DbPool, credential_repo: Arc<dyn CredentialRepository>) -> Self {
        Self {
            pool,
            credential_repo,
        }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(pool, Arc::new(SqlxCredentialRepository::new()))
    }

    /// Compare a supplied password against the stored hash for a user.
    ///
    /// A mismatch is `Ok(false)`; a missing credential row is `NotFound`.
    #[instrument(skip(self, password), fields(user_id = %user_id))]
    pub async fn compare_user_password(&self, user_id: UserId, password: &str) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;

        let credential = self
            .credential_repo
            .find_by_user(&mut conn, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", user_id))?;

        hashing::verify_password(password, &credential.hashed_password)
    }

    /// Compare a supplied password against the stored hash for a company.
    #[instrument(skip(self, password), fields(company_id = %company_id))]
    pub async fn compare_company_password(
        &self,
        company_id: CompanyId,
        password: &str,
    ) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;

        let credential = self
            .credential_repo
            .find_by_company(&mut conn, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", company_id))?;

        hashing::verify_password(password, &credential.hashed_password)
    }

    /// Create the credential row for a freshly registered user.
    /// Runs on the caller's open transaction.
    pub async fn save_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        password: &str,
    ) -> Result<CredentialRecord> {
        if self
            .credential_repo
            .find_by_user(&mut *conn, user_id)
            .await?
            .is_some()
        {
            return Err(AnteroomError::duplicated(
                format!("user {} already has a credential", user_id),
                "credential",
            ));
        }

        let salt = hashing::generate_salt();
        let hashed = hashing::hash_password(password, &salt)?;
        self.credential_repo
            .insert_for_user(conn, user_id, salt.as_str(), &hashed)
            .await
    }

    /// Create the credential row for a freshly registered company.
    /// Runs on the caller's open transaction.
    pub async fn save_for_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        password: &str,
    ) -> Result<CredentialRecord> {
        if self
            .credential_repo
            .find_by_company(&mut *conn, company_id)
            .await?
            .is_some()
        {
            return Err(AnteroomError::duplicated(
                format!("company {} already has a credential", company_id),
                "credential",
            ));
        }

        let salt = hashing::generate_salt();
        let hashed = hashing::hash_password(password, &salt)?;
        self.credential_repo
            .insert_for_company(conn, company_id, salt.as_str(), &hashed)
            .await
    }

    /// Rotate a user's password with a fresh salt.
    /// Runs on the caller's open transaction.
    pub async fn update_user_password(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        password: &str,
    ) -> Result<CredentialRecord> {
        let credential = self
            .credential_repo
            .find_by_user(&mut *conn, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", user_id))?;

        let salt = hashing::generate_salt();
        let hashed = hashing::hash_password(password, &salt)?;
        self.credential_repo
            .update_hash(conn, credential.id, salt.as_str(), &hashed)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_updated(format!("credential for user {} vanished", user_id))
            })
    }

    /// Rotate a company's password with a fresh salt.
    /// Runs on the caller's open transaction.
    pub async fn update_company_password(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
        password: &str,
    ) -> Result<CredentialRecord> {
        let credential = self
            .credential_repo
            .find_by_company(&mut *conn, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", company_id))?;

        let salt = hashing::generate_salt();
        let hashed = hashing::hash_password(password, &salt)?;
        self.credential_repo
            .update_hash(conn, credential.id, salt.as_str(), &hashed)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_updated(format!(
                    "credential for company {} vanished",
                    company_id
                ))
            })
    }

    /// Delete a user's credential row. Runs on the caller's open transaction.
    pub async fn remove_for_user(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
    ) -> Result<bool> {
        let credential = self
            .credential_repo
            .find_by_user(&mut *conn, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", user_id))?;

        if !self.credential_repo.delete(conn, credential.id).await? {
            return Err(AnteroomError::not_removed(format!(
                "credential for user {} could not be removed",
                user_id
            )));
        }
        Ok(true)
    }

    /// Delete a company's credential row. Runs on the caller's open transaction.
    pub async fn remove_for_company(
        &self,
        conn: &mut SqliteConnection,
        company_id: CompanyId,
    ) -> Result<bool> {
        let credential = self
            .credential_repo
            .find_by_company(&mut *conn, company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("credential", company_id))?;

        if !self.credential_repo.delete(conn, credential.id).await? {
            return Err(AnteroomError::not_removed(format!(
                "credential for company {} could not be removed",
                company_id
            )));
        }
        Ok(true)
    }
}
