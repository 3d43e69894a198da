//! User lifecycle. Registration and removal keep the user row and its
//! credential row in lockstep inside one transaction.

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use crate::auth::credential_service::CredentialService;
use crate::auth::models::{NewUser, User};
use crate::domain::UserId;
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{
    CompanyRepository, SqlxCompanyRepository, SqlxUserRepository, UserRepository,
};
use crate::storage::DbPool;

/// Service for managing user accounts.
#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
    user_repo: Arc<dyn UserRepository>,
    company_repo: Arc<dyn CompanyRepository>,
    credentials: Arc<CredentialService>,
}

impl UserService {
    pub fn new(
        pool: DbPool,
        user_repo: Arc<dyn UserRepository>,
        company_repo: Arc<dyn CompanyRepository>,
        credentials: Arc<CredentialService>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            company_repo,
            credentials,
        }
    }

    pub fn with_sqlx(pool: DbPool, credentials: Arc<CredentialService>) -> Self {
        Self::new(
            pool,
            Arc::new(SqlxUserRepository::new()),
            Arc::new(SqlxCompanyRepository::new()),
            credentials,
        )
    }

    /// Register a user under an existing company.
    ///
    /// The user row and its credential row are created in one transaction;
    /// a duplicate email fails `Duplicated` before anything is written.
    #[instrument(skip(self, new_user), fields(email = %new_user.email, company_id = %new_user.company_id))]
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.company_repo
            .find_by_id(&mut tx, new_user.company_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", new_user.company_id))?;

        if self
            .user_repo
            .find_by_email(&mut tx, &new_user.email)
            .await?
            .is_some()
        {
            return Err(AnteroomError::duplicated(
                format!("email '{}' is already registered", new_user.email),
                "user",
            ));
        }

        let user = self
            .user_repo
            .insert(
                &mut tx,
                new_user.company_id,
                &new_user.name,
                &new_user.role,
                &new_user.email,
            )
            .await?;

        self.credentials
            .save_for_user(&mut tx, user.id, &new_user.password)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit user registration"))?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Fetch a user by id.
    pub async fn find_by_id(&self, user_id: UserId) -> Result<User> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.user_repo
            .find_by_id(&mut conn, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))
    }

    /// Fetch a user by email.
    pub async fn find_by_email(&self, email: &str) -> Result<User> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.user_repo
            .find_by_email(&mut conn, email)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", email))
    }

    /// Update a user's display name and job title.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn update_profile(&self, user_id: UserId, name: &str, role: &str) -> Result<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        let user = self
            .user_repo
            .update_profile(&mut tx, user_id, name, role)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit profile update"))?;

        info!(user_id = %user_id, "user profile updated");
        Ok(user)
    }

    /// Rotate a user's password.
    #[instrument(skip(self, password), fields(user_id = %user_id))]
    pub async fn update_password(&self, user_id: UserId, password: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.user_repo
            .find_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))?;

        self.credentials
            .update_user_password(&mut tx, user_id, password)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit password update"))?;

        info!(user_id = %user_id, "user password rotated");
        Ok(())
    }

    /// Remove a user and its credential row in one transaction.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove(&self, user_id: UserId) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.user_repo
            .find_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))?;

        self.credentials.remove_for_user(&mut tx, user_id).await?;

        if !self.user_repo.delete(&mut tx, user_id).await? {
            return Err(AnteroomError::not_removed(format!(
                "user {} could not be removed",
                user_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit user removal"))?;

        info!(user_id = %user_id, "user removed");
        Ok(true)
    }
}
