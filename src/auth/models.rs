//! Domain models for subjects, sessions, rooms, membership and invitations.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::domain::{
    CompanyId, CredentialId, InvitationId, ParticipantId, RoomId, SessionId, UserId,
};

/// The authenticated principal a session is bound to.
///
/// A tagged union rather than a common base type: capability checks are
/// exhaustive matches instead of runtime downcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum SubjectRef {
    Company(CompanyId),
    User(UserId),
}

impl SubjectRef {
    pub fn is_company(&self) -> bool {
        matches!(self, SubjectRef::Company(_))
    }

    pub fn is_user(&self) -> bool {
        matches!(self, SubjectRef::User(_))
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        match self {
            SubjectRef::Company(id) => Some(*id),
            SubjectRef::User(_) => None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            SubjectRef::User(id) => Some(*id),
            SubjectRef::Company(_) => None,
        }
    }
}

impl Display for SubjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubjectRef::Company(id) => write!(f, "company:{}", id),
            SubjectRef::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// A server-held session binding a subject to an opaque bearer token.
///
/// Lives exclusively in the in-memory session store from login until logout or
/// lazy expiry; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub subject: SubjectRef,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Payload for inserting a session into the store (the store assigns the id).
#[derive(Debug, Clone)]
pub struct NewSession {
    pub subject: SubjectRef,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A tenant company. Companies authenticate by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user belonging to a company. Users authenticate by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub company_id: CompanyId,
    pub name: String,
    /// Free-form job title (e.g. "Developer")
    pub role: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chat room. Room names are unique across the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Membership role within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Host,
    Guest,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Host => "host",
            ParticipantRole::Guest => "guest",
        }
    }
}

impl Display for ParticipantRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParticipantRole {
    type Err = ParticipantRoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(ParticipantRole::Host),
            "guest" => Ok(ParticipantRole::Guest),
            other => Err(ParticipantRoleParseError(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported participant role: {0}")]
pub struct ParticipantRoleParseError(pub String);

/// A user's membership in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: ParticipantRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A one-time room-entry code bound to a `(user, room)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: InvitationId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A salted credential record for one subject. The hash is an Argon2id PHC
/// string computed with the stored per-record salt; neither is ever logged.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: CredentialId,
    pub user_id: Option<UserId>,
    pub company_id: Option<CompanyId>,
    pub salt: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to register a company.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCompany {
    #[validate(length(min = 1, max = 120, message = "Company name must be 1..=120 characters"))]
    pub name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request to register a user under a company.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub company_id: CompanyId,
    #[validate(length(min = 1, max = 120, message = "User name must be 1..=120 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 120, message = "Role must be 1..=120 characters"))]
    pub role: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_ref_predicates() {
        let company = SubjectRef::Company(CompanyId::new(1));
        let user = SubjectRef::User(UserId::new(2));

        assert!(company.is_company());
        assert!(!company.is_user());
        assert_eq!(company.company_id(), Some(CompanyId::new(1)));
        assert_eq!(company.user_id(), None);

        assert!(user.is_user());
        assert!(!user.is_company());
        assert_eq!(user.user_id(), Some(UserId::new(2)));
        assert_eq!(user.company_id(), None);
    }

    #[test]
    fn test_subject_ref_display() {
        assert_eq!(SubjectRef::Company(CompanyId::new(9)).to_string(), "company:9");
        assert_eq!(SubjectRef::User(UserId::new(4)).to_string(), "user:4");
    }

    #[test]
    fn test_participant_role_roundtrip() {
        for role in [ParticipantRole::Host, ParticipantRole::Guest] {
            let parsed: ParticipantRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_participant_role_rejects_unknown() {
        let result: Result<ParticipantRole, _> = "admin".parse();
        assert!(result.is_err());
        // Case sensitive, matching the stored representation
        assert!("Host".parse::<ParticipantRole>().is_err());
        assert!("GUEST".parse::<ParticipantRole>().is_err());
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(1),
            subject: SubjectRef::User(UserId::new(1)),
            token: "token".to_string(),
            expires_at: now - chrono::Duration::seconds(1),
            created_at: now,
            updated_at: now,
        };
        assert!(session.is_expired(now));

        let live = Session {
            expires_at: now + chrono::Duration::minutes(30),
            ..session
        };
        assert!(!live.is_expired(now));
    }

    #[test]
    fn test_invitation_expiry_boundary() {
        let now = Utc::now();
        let invitation = Invitation {
            id: InvitationId::new(1),
            room_id: RoomId::new(3),
            user_id: UserId::new(7),
            code: "A1b2C3d4".to_string(),
            expires_at: now,
            created_at: now,
            updated_at: now,
        };
        // expires_at == now is not yet expired; strictly past is
        assert!(!invitation.is_expired(now));
        assert!(invitation.is_expired(now + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_new_user_validation() {
        let valid = NewUser {
            company_id: CompanyId::new(1),
            name: "Jan Levinson".to_string(),
            role: "Boss".to_string(),
            email: "jan@example.com".to_string(),
            password: "secret123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = NewUser {
            email: "not-an-email".to_string(),
            ..valid.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_password = NewUser {
            password: "short".to_string(),
            ..valid
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_new_company_validation() {
        let valid = NewCompany {
            name: "Acme".to_string(),
            password: "secret123".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_name = NewCompany {
            name: "".to_string(),
            password: "secret123".to_string(),
        };
        assert!(empty_name.validate().is_err());
    }
}
