//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for the access-control
//! core's relational entities. Sessions never touch this layer; they live in
//! the in-memory [`crate::auth::SessionStore`].

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use crate::config::DatabaseConfig;

pub use migrations::run_migrations;
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    CompanyRepository, CredentialRepository, InvitationRepository, ParticipantRepository,
    RoomRepository, SqlxCompanyRepository, SqlxCredentialRepository, SqlxInvitationRepository,
    SqlxParticipantRepository, SqlxRoomRepository, SqlxUserRepository, UserRepository,
};

use crate::errors::{AnteroomError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| AnteroomError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
