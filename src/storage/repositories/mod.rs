//! Repository traits and their SQLx implementations.
//!
//! Every method takes a `&mut SqliteConnection` rather than a pool: the
//! calling service owns the transaction, and a single service call performs
//! all of its reads and writes through one connection. Cascading operations
//! reuse the caller's open transaction by receiving the same connection.

mod company;
mod credential;
mod invitation;
mod participant;
mod room;
mod user;

pub use company::{CompanyRepository, SqlxCompanyRepository};
pub use credential::{CredentialRepository, SqlxCredentialRepository};
pub use invitation::{InvitationRepository, SqlxInvitationRepository};
pub use participant::{ParticipantRepository, SqlxParticipantRepository};
pub use room::{RoomRepository, SqlxRoomRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// SQLite reports uniqueness violations as generic database errors; the
/// message prefix is the only stable discriminator.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db_err| db_err.message().contains("UNIQUE constraint failed"))
        .unwrap_or(false)
}
