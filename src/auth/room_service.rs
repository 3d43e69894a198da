//! Room lifecycle. Deleting a room is the one cascade in the system: guests,
//! then the host, then the room itself, all inside a single transaction.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::models::{Participant, Room};
use crate::auth::participant_service::ParticipantService;
use crate::domain::RoomId;
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::{
    InvitationRepository, RoomRepository, SqlxInvitationRepository, SqlxRoomRepository,
};
use crate::storage::DbPool;

/// Service for creating, renaming and deleting rooms.
#[derive(Clone)]
pub struct RoomService {
    pool: DbPool,
    room_repo: Arc<dyn RoomRepository>,
    invitation_repo: Arc<dyn InvitationRepository>,
    participants: Arc<ParticipantService>,
}

impl RoomService {
    pub fn new(
        pool: DbPool,
        room_repo: Arc<dyn RoomRepository>,
        invitation_repo: Arc<dyn InvitationRepository>,
        participants: Arc<ParticipantService>,
    ) -> Self {
        Self {
            pool,
            room_repo,
            invitation_repo,
            participants,
        }
    }

    pub fn with_sqlx(pool: DbPool, participants: Arc<ParticipantService>) -> Self {
        Self::new(
            pool,
            Arc::new(SqlxRoomRepository::new()),
            Arc::new(SqlxInvitationRepository::new()),
            participants,
        )
    }

    /// Create a room. Room names are a candidate key.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn create(&self, name: &str) -> Result<Room> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        if self.room_repo.find_by_name(&mut tx, name).await?.is_some() {
            return Err(AnteroomError::duplicated(
                format!("room name '{}' already exists", name),
                "room",
            ));
        }

        let room = self.room_repo.insert(&mut tx, name).await?;
        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit room"))?;

        info!(room_id = %room.id, name = %room.name, "room created");
        Ok(room)
    }

    /// Fetch a room by id.
    pub async fn find_by_id(&self, room_id: RoomId) -> Result<Room> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.room_repo
            .find_by_id(&mut conn, room_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", room_id))
    }

    /// Fetch a room by name.
    pub async fn find_by_name(&self, name: &str) -> Result<Room> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.room_repo
            .find_by_name(&mut conn, name)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", name))
    }

    /// List all rooms (possibly empty).
    pub async fn list_all(&self) -> Result<Vec<Room>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to acquire connection"))?;
        self.room_repo.find_all(&mut conn).await
    }

    /// Fetch the room's host participant.
    pub async fn find_host(&self, room_id: RoomId) -> Result<Participant> {
        self.participants.find_host(room_id).await
    }

    /// Rename a room, re-checking name uniqueness.
    #[instrument(skip(self), fields(room_id = %room_id, name = %name))]
    pub async fn rename(&self, room_id: RoomId, name: &str) -> Result<Room> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.room_repo
            .find_by_id(&mut tx, room_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", room_id))?;

        if self.room_repo.find_by_name(&mut tx, name).await?.is_some() {
            return Err(AnteroomError::duplicated(
                format!("room name '{}' already exists", name),
                "room",
            ));
        }

        let room = self
            .room_repo
            .update_name(&mut tx, room_id, name)
            .await?
            .ok_or_else(|| {
                AnteroomError::not_updated(format!("room {} could not be renamed", room_id))
            })?;

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit rename"))?;

        info!(room_id = %room_id, name = %name, "room renamed");
        Ok(room)
    }

    /// Delete a room and cascade to every participant, host included.
    ///
    /// Guests and host are removed through the participant manager on this
    /// method's transaction, outstanding invitations into the room are
    /// voided, then the room row goes; either everything commits or nothing
    /// does.
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub async fn remove(&self, room_id: RoomId) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to begin transaction"))?;

        self.room_repo
            .find_by_id(&mut tx, room_id)
            .await?
            .ok_or_else(|| AnteroomError::not_found("room", room_id))?;

        let removed_participants = self.participants.remove_all_in_room(&mut tx, room_id).await?;
        self.invitation_repo
            .delete_all_for_room(&mut tx, room_id)
            .await?;

        if !self.room_repo.delete(&mut tx, room_id).await? {
            return Err(AnteroomError::not_removed(format!(
                "room {} could not be removed",
                room_id
            )));
        }

        tx.commit()
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to commit room deletion"))?;

        info!(
            room_id = %room_id,
            removed_participants = removed_participants,
            "room deleted with participant cascade"
        );
        Ok(true)
    }
}
