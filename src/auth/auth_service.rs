//! Session manager: login, logout, token verification and capability queries.
//!
//! Expiry is lazy and pull-based. Every access path first evicts the session
//! if its deadline has passed, so an expired session is observationally
//! identical to one that never existed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::auth::credential_service::CredentialService;
use crate::auth::models::{NewSession, ParticipantRole, Session, SubjectRef};
use crate::auth::secrets;
use crate::auth::session_store::SessionStore;
use crate::config::AuthConfig;
use crate::domain::{RoomId, SessionId, UserId};
use crate::errors::{AnteroomError, AuthErrorType, Result};
use crate::storage::repositories::{
    CompanyRepository, ParticipantRepository, SqlxCompanyRepository, SqlxParticipantRepository,
    SqlxUserRepository, UserRepository,
};
use crate::storage::DbPool;

/// Service for authenticating subjects and answering capability queries.
#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    sessions: Arc<SessionStore>,
    company_repo: Arc<dyn CompanyRepository>,
    user_repo: Arc<dyn UserRepository>,
    participant_repo: Arc<dyn ParticipantRepository>,
    credentials: Arc<CredentialService>,
    session_ttl: chrono::Duration,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DbPool,
        sessions: Arc<SessionStore>,
        company_repo: Arc<dyn CompanyRepository>,
        user_repo: Arc<dyn UserRepository>,
        participant_repo: Arc<dyn ParticipantRepository>,
        credentials: Arc<CredentialService>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            pool,
            sessions,
            company_repo,
            user_repo,
            participant_repo,
            credentials,
            session_ttl: config.session_ttl(),
        }
    }

    pub fn with_sqlx(
        pool: DbPool,
        sessions: Arc<SessionStore>,
        credentials: Arc<CredentialService>,
        config: &AuthConfig,
    ) -> Self {
        Self::new(
            pool,
            sessions,
            Arc::new(SqlxCompanyRepository::new()),
            Arc::new(SqlxUserRepository::new()),
            Arc::new(SqlxParticipantRepository::new()),
            credentials,
            config,
        )
    }

    /// Authenticate a company by name and open a session for it.
    ///
    /// Multiple concurrent sessions per subject are permitted.
    #[instrument(skip(self, password), fields(company = %name))]
    pub async fn login_as_company(&self, name: &str, password: &str) -> Result<Session> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        let company = self
            .company_repo
            .find_by_name(&mut conn, name)
            .await?
            .ok_or_else(|| AnteroomError::not_found("company", name))?;
        drop(conn);

        if !self
            .credentials
            .compare_company_password(company.id, password)
            .await?
        {
            return Err(AnteroomError::auth(
                format!("password mismatch for company '{}'", name),
                AuthErrorType::InvalidCredentials,
            ));
        }

        let session = self.open_session(SubjectRef::Company(company.id))?;
        info!(
            session_id = %session.id,
            company_id = %company.id,
            expires_at = %session.expires_at,
            "company logged in"
        );
        Ok(session)
    }

    /// Authenticate a user by email and open a session for it.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login_as_user(&self, email: &str, password: &str) -> Result<Session> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        let user = self
            .user_repo
            .find_by_email(&mut conn, email)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", email))?;
        drop(conn);

        if !self
            .credentials
            .compare_user_password(user.id, password)
            .await?
        {
            return Err(AnteroomError::auth(
                format!("password mismatch for user '{}'", email),
                AuthErrorType::InvalidCredentials,
            ));
        }

        let session = self.open_session(SubjectRef::User(user.id))?;
        info!(
            session_id = %session.id,
            user_id = %user.id,
            expires_at = %session.expires_at,
            "user logged in"
        );
        Ok(session)
    }

    /// Fetch a live session, evicting it first if its deadline has passed.
    pub fn get_session(&self, session_id: SessionId) -> Result<Session> {
        if self.evict_if_expired(session_id)? {
            return Err(AnteroomError::not_found("session", session_id));
        }
        self.sessions
            .find_by_id(session_id)
            .ok_or_else(|| AnteroomError::not_found("session", session_id))
    }

    /// Compare a presented bearer token against the stored one.
    ///
    /// `NotFound` when no live session exists under the id; a plain mismatch
    /// is `Ok(false)` so callers can distinguish "bad token" from "no session".
    #[instrument(skip(self, token), fields(session_id = %session_id))]
    pub fn verify_token(&self, session_id: SessionId, token: &str) -> Result<bool> {
        let session = self.get_session(session_id)?;
        Ok(secrets::constant_time_eq(token, &session.token))
    }

    /// Evict the session if it has expired.
    ///
    /// Returns true when the session was expired and is now gone, false when
    /// it is still live; `NotFound` when no session exists under the id. The
    /// check and delete are not atomic with respect to a concurrent logout:
    /// losing that race still counts as a successful eviction.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn evict_if_expired(&self, session_id: SessionId) -> Result<bool> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .ok_or_else(|| AnteroomError::not_found("session", session_id))?;

        if session.is_expired(Utc::now()) {
            self.sessions.remove(session_id);
            info!(session_id = %session_id, "expired session evicted");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Terminate a session unconditionally.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn logout(&self, session_id: SessionId) -> Result<bool> {
        if self.sessions.remove(session_id) {
            info!(session_id = %session_id, "session logged out");
            Ok(true)
        } else {
            Err(AnteroomError::not_found("session", session_id))
        }
    }

    /// Whether the subject is a company.
    pub fn is_company(&self, subject: &SubjectRef) -> bool {
        subject.is_company()
    }

    /// Whether the subject is a user.
    pub fn is_user(&self, subject: &SubjectRef) -> bool {
        subject.is_user()
    }

    /// Whether the subject is exactly the given user.
    pub fn is_this_user(&self, subject: &SubjectRef, user_id: UserId) -> bool {
        subject.user_id() == Some(user_id)
    }

    /// Whether the subject is the host of the given room.
    ///
    /// A non-user subject or a room without a host answers false; only a
    /// failed store lookup is an error.
    #[instrument(skip(self), fields(subject = %subject, room_id = %room_id))]
    pub async fn is_host_of(&self, subject: &SubjectRef, room_id: RoomId) -> Result<bool> {
        let Some(user_id) = subject.user_id() else {
            return Ok(false);
        };

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        let hosts = self
            .participant_repo
            .find_all_by_role_in_room(&mut conn, ParticipantRole::Host, room_id)
            .await?;

        Ok(hosts.first().map(|host| host.user_id) == Some(user_id))
    }

    fn open_session(&self, subject: SubjectRef) -> Result<Session> {
        let token = secrets::generate_session_token();
        let expires_at = Utc::now() + self.session_ttl;
        self.sessions.create(NewSession {
            subject,
            token,
            expires_at,
        })
    }
}
