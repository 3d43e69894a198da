//! Participant manager: room-membership invariants.
//!
//! Two invariants live here: a user participates in a room at most once, and
//! each room has exactly one host. The host pre-check runs inside the same
//! transaction as the insert; a partial unique index backs it up at the store.

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{info, instrument};

use crate::auth::models::{Participant, ParticipantRole};
use crate::domain::{ParticipantId, RoomId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{
    ParticipantRepository, RoomRepository, SqlxParticipantRepository, SqlxRoomRepository,
    SqlxUserRepository, UserRepository,
};
use crate::storage::DbPool;

/// Service enforcing room-membership rules.
#[derive(Clone)]
pub struct ParticipantService {
    pool: DbPool,
    participant_repo: Arc<dyn ParticipantRepository>,
    room_repo: Arc<dyn RoomRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ParticipantService {
    pub fn new(
        pool: DbPool,
        participant_repo: Arc<dyn ParticipantRepository>,
        room_repo: Arc<dyn RoomRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            pool,
            participant_repo,
            room_repo,
            user_repo,
        }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(
            pool,
            Arc::new(SqlxParticipantRepository::new()),
            Arc::new(SqlxRoomRepository::new()),
            Arc::new(SqlxUserRepository::new()),
        )
    }

    /// Add a user to a room with the given role.
    ///
    /// Fails `NotFound` when room or user is missing, `Duplicated` when the
    /// user already participates, and `NotSaved` when a second host is
    /// attempted.
    #[instrument(skip(self), fields(room_id = %room_id, user_id = %user_id, role = %role))]
    pub async fn add_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
        role: ParticipantRole,
    ) -> Result<Participant> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.room_repo
            .find_by_id(&mut tx, room_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", room_id))?;
        self.user_repo
            .find_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("user", user_id))?;

        if self
            .participant_repo
            .find_by_user_in_room(&mut tx, user_id, room_id)
            .await?
            .is_some()
        {
            return Err(AnteroomError::duplicated(
                format!("user {} is already in room {}", user_id, room_id),
                "participant",
            ));
        }

        if role == ParticipantRole::Host {
            let hosts = self
                .participant_repo
                .find_all_by_role_in_room(&mut tx, ParticipantRole::Host, room_id)
                .await?;
            if !hosts.is_empty() {
                return Err(AnteroomError::not_saved(format!(
                    "room {} already has a host",
                    room_id
                )));
            }
        }

        let participant = self
            .participant_repo
            .insert(&mut tx, room_id, user_id, role)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit participant"))?;

        info!(
            participant_id = %participant.id,
            room_id = %room_id,
            user_id = %user_id,
            role = %role,
            "participant added"
        );
        Ok(participant)
    }

    /// Remove a single participant.
    ///
    /// The host cannot be removed individually; it goes only with its room.
    #[instrument(skip(self), fields(participant_id = %participant_id))]
    pub async fn remove_participant(&self, participant_id: ParticipantId) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        let participant = self
            .participant_repo
            .find_by_id(&mut tx, participant_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("participant", participant_id))?;

        if participant.role == ParticipantRole::Host {
            return Err(AnteroomError::not_removed(format!(
                "participant {} hosts room {} and can only be removed with it",
                participant_id, participant.room_id
            )));
        }

        if !self.participant_repo.delete(&mut tx, participant_id).await? {
            return Err(AnteroomError::not_removed(format!(
                "participant {} could not be removed",
                participant_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit removal"))?;

        info!(participant_id = %participant_id, "participant removed");
        Ok(true)
    }

    /// Fetch a participant by id.
    pub async fn find_by_id(&self, participant_id: ParticipantId) -> Result<Participant> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.participant_repo
            .find_by_id(&mut conn, participant_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("participant", participant_id))
    }

    /// Fetch a user's membership in a room.
    pub async fn find_by_user_in_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Participant> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.participant_repo
            .find_by_user_in_room(&mut conn, user_id, room_id)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_found(
                    "participant",
                    format!("user:{} room:{}", user_id, room_id),
                )
            })
    }

    /// List every participant of a room (possibly empty).
    pub async fn find_all_in_room(&self, room_id: RoomId) -> Result<Vec<Participant>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.participant_repo
            .find_all_in_room(&mut conn, room_id)
            .await
    }

    /// Fetch the host of a room. `NotFound` when the room has none.
    pub async fn find_host(&self, room_id: RoomId) -> Result<Participant> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        let hosts = self
            .participant_repo
            .find_all_by_role_in_room(&mut conn, ParticipantRole::Host, room_id)
            .await?;
        hosts
            .into_iter()
            .next()
            .ok_or_else(|| AnteroomError::not_found("host", room_id))
    }

    /// Cascade removal of every participant in a room: guests first, then the
    /// host, so "room has members without a host" is never observable outside
    /// the enclosing transaction.
    ///
    /// Runs on the caller's open connection — room deletion wraps this and the
    /// room delete in a single transaction.
    #[instrument(skip(self, conn), fields(room_id = %room_id))]
    pub async fn remove_all_in_room(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
    ) -> Result<u64> {
        let mut removed = 0u64;

        let guests = self
            .participant_repo
            .find_all_by_role_in_room(&mut *conn, ParticipantRole::Guest, room_id)
            .await?;
        for guest in guests {
            if !self.participant_repo.delete(&mut *conn, guest.id).await? {
                return Err(AnteroomError::not_removed(format!(
                    "guest {} in room {} could not be removed",
                    guest.id, room_id
                )));
            }
            removed += 1;
        }

        let hosts = self
            .participant_repo
            .find_all_by_role_in_room(&mut *conn, ParticipantRole::Host, room_id)
            .await?;
        for host in hosts {
            if !self.participant_repo.delete(&mut *conn, host.id).await? {
                return Err(AnteroomError::not_removed(format!(
                    "host {} in room {} could not be removed",
                    host.id, room_id
                )));
            }
            removed += 1;
        }

        info!(room_id = %room_id, removed = removed, "participants cascaded");
        Ok(removed)
    }
}
