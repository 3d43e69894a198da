//! # Anteroom
//!
//! Anteroom is the access-control core of a multi-tenant chat platform:
//! companies and users authenticate to obtain time-limited sessions, and users
//! gain entry into rooms through one-time invitation codes.
//!
//! ## Architecture
//!
//! The system follows a layered architecture pattern:
//!
//! ```text
//! Controllers (external) → Auth / Invitation / Participant services
//!         ↓                          ↓
//!   Session Store (in-memory)   Persistence Layer (SQLx + SQLite)
//! ```
//!
//! ## Core Components
//!
//! - **Session Store**: mutex-guarded in-memory map owning session ids and
//!   records for the lifetime of the process
//! - **Auth Service**: login, logout, lazy session expiry, constant-time token
//!   verification and capability queries
//! - **Invitation Service**: one-time room-entry codes with destructive
//!   compare semantics
//! - **Participant Service**: single-host-per-room and unique-membership
//!   invariants, plus the room-deletion cascade
//! - **Persistence Layer**: SQLx repositories over SQLite, transaction-scoped
//!   per service call
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use anteroom::{Config, Result, ServiceGraph};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     anteroom::init_tracing(&config.observability)?;
//!     let services = ServiceGraph::bootstrap(&config).await?;
//!
//!     let session = services.auth.login_as_company("Acme", "secret123").await?;
//!     assert!(services.auth.verify_token(session.id, &session.token)?);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

use std::sync::Arc;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AnteroomError, Result};
pub use observability::init_tracing;

use auth::{
    AuthService, CompanyService, CredentialService, InvitationNotifier, InvitationService,
    LogNotifier, ParticipantService, RoomService, SessionStore, UserService,
};
use config::AuthConfig;
use storage::DbPool;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// The explicitly owned service graph, built once at startup and passed by
/// reference. There is no global state: every service receives its
/// dependencies through its constructor.
#[derive(Clone)]
pub struct ServiceGraph {
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<CredentialService>,
    pub auth: Arc<AuthService>,
    pub invitations: Arc<InvitationService>,
    pub participants: Arc<ParticipantService>,
    pub rooms: Arc<RoomService>,
    pub users: Arc<UserService>,
    pub companies: Arc<CompanyService>,
    pool: DbPool,
}

impl ServiceGraph {
    /// Create the pool (running migrations when configured) and wire the
    /// services with the default log-based invitation notifier.
    pub async fn bootstrap(config: &Config) -> Result<Self> {
        let pool = storage::create_pool(&config.database).await?;
        Ok(Self::with_pool(
            pool,
            &config.auth,
            Arc::new(LogNotifier::new()),
        ))
    }

    /// Wire the services over an existing pool, injecting the notifier.
    pub fn with_pool(
        pool: DbPool,
        auth_config: &AuthConfig,
        notifier: Arc<dyn InvitationNotifier>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let credentials = Arc::new(CredentialService::with_sqlx(pool.clone()));
        let auth = Arc::new(AuthService::with_sqlx(
            pool.clone(),
            Arc::clone(&sessions),
            Arc::clone(&credentials),
            auth_config,
        ));
        let invitations = Arc::new(InvitationService::with_sqlx(
            pool.clone(),
            notifier,
            auth_config,
        ));
        let participants = Arc::new(ParticipantService::with_sqlx(pool.clone()));
        let rooms = Arc::new(RoomService::with_sqlx(
            pool.clone(),
            Arc::clone(&participants),
        ));
        let users = Arc::new(UserService::with_sqlx(
            pool.clone(),
            Arc::clone(&credentials),
        ));
        let companies = Arc::new(CompanyService::with_sqlx(
            pool.clone(),
            Arc::clone(&credentials),
        ));

        Self {
            sessions,
            credentials,
            auth,
            invitations,
            participants,
            rooms,
            users,
            companies,
            pool,
        }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
