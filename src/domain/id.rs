//! Domain ID Types with NewType Pattern
//!
//! Type-safe wrappers for entity identifiers so a `UserId` can never be passed
//! where a `RoomId` is expected. Relational entity ids wrap the store-generated
//! `i64` row id; [`SessionId`] wraps the random 64-bit key of the in-memory
//! session store and is never persisted.

use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Decode, Encode, Sqlite, Type};
use std::fmt;

/// Macro to generate NewType ID wrappers over store-generated row ids
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw row id (for database retrieval)
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw row id
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        // SQLx trait implementations for database compatibility
        impl Type<Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <i64 as Type<Sqlite>>::type_info()
            }
        }

        impl<'q> Encode<'q, Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> Result<IsNull, BoxDynError> {
                <i64 as Encode<'q, Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> Decode<'r, Sqlite> for $name {
            fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
                Ok(Self(<i64 as Decode<'r, Sqlite>>::decode(value)?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a company
    CompanyId
);

entity_id!(
    /// Unique identifier for a user
    UserId
);

entity_id!(
    /// Unique identifier for a chat room
    RoomId
);

entity_id!(
    /// Unique identifier for a room participant
    ParticipantId
);

entity_id!(
    /// Unique identifier for a room invitation
    InvitationId
);

entity_id!(
    /// Unique identifier for a credential record
    CredentialId
);

/// Key of a live session in the in-memory session store.
///
/// Randomly drawn from the full 64-bit space at login; unique among live
/// sessions for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<SessionId> for u64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_roundtrip() {
        let id = UserId::new(7);
        assert_eq!(id.as_i64(), 7);
        assert_eq!(i64::from(id), 7);
        assert_eq!(UserId::from(7), id);
    }

    #[test]
    fn entity_id_display() {
        assert_eq!(RoomId::new(3).to_string(), "3");
        assert_eq!(SessionId::new(u64::MAX).to_string(), u64::MAX.to_string());
    }

    #[test]
    fn entity_id_serialization_is_transparent() {
        let id = InvitationId::new(12);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "12");

        let back: InvitationId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn session_id_full_range() {
        let id = SessionId::new(u64::MAX);
        assert_eq!(id.as_u64(), u64::MAX);
        let json = serde_json::to_string(&id).expect("serialize");
        let back: SessionId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn entity_id_hash_usable_as_map_key() {
        use std::collections::HashMap;

        let id = ParticipantId::new(5);
        let mut map = HashMap::new();
        map.insert(id, "participant");
        assert_eq!(map.get(&ParticipantId::new(5)), Some(&"participant"));
    }

    #[test]
    fn compile_time_type_safety() {
        fn takes_user_id(_id: UserId) {}
        fn takes_room_id(_id: RoomId) {}

        takes_user_id(UserId::new(1));
        takes_room_id(RoomId::new(1));

        // The following would fail at compile time (uncomment to verify):
        // takes_user_id(RoomId::new(1)); // ERROR: mismatched types
    }
}
