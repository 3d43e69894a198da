//! Typed domain identifiers shared across the service and storage layers.

mod id;

pub use id::{
    CompanyId, CredentialId, InvitationId, ParticipantId, RoomId, SessionId, UserId,
};
