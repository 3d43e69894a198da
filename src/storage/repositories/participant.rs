//! Participant repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use std::str::FromStr;
use tracing::instrument;

use crate::auth::models::{Participant, ParticipantRole};
use crate::domain::{ParticipantId, RoomId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for participants.
#[derive(Debug, Clone, FromRow)]
struct ParticipantRow {
    id: ParticipantId,
    room_id: RoomId,
    user_id: UserId,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = AnteroomError;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        let role = ParticipantRole::from_str(&row.role).map_err(|e| {
            AnteroomError::validation(format!("Invalid participant role '{}': {}", row.role, e))
        })?;

        Ok(Participant {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository trait for participant rows.
#[async_trait]
pub trait ParticipantRepository: Send + Sync {
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
        user_id: UserId,
        role: ParticipantRole,
    ) -> Result<Participant>;

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: ParticipantId,
    ) -> Result<Option<Participant>>;

    async fn find_by_user_in_room(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Participant>>;

    async fn find_all_in_room(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
    ) -> Result<Vec<Participant>>;

    async fn find_all_by_role_in_room(
        &self,
        conn: &mut SqliteConnection,
        role: ParticipantRole,
        room_id: RoomId,
    ) -> Result<Vec<Participant>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: ParticipantId) -> Result<bool>;
}

/// SQLx-based participant repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxParticipantRepository;

impl SqlxParticipantRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ParticipantRepository for SqlxParticipantRepository {
    #[instrument(skip(self, conn), fields(room_id = %room_id, user_id = %user_id, role = %role))]
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
        user_id: UserId,
        role: ParticipantRole,
    ) -> Result<Participant> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ParticipantRow>(
            r#"
            INSERT INTO participants (room_id, user_id, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, room_id, user_id, role, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // Either the (room, user) pair or the one-host-per-room index
                AnteroomError::duplicated(
                    format!(
                        "participant constraint violated for user {} in room {}",
                        user_id, room_id
                    ),
                    "participant",
                )
            } else {
                AnteroomError::database(e, "Failed to insert participant")
            }
        })?;

        Participant::try_from(row)
    }

    #[instrument(skip(self, conn), fields(participant_id = %id))]
    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: ParticipantId,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, room_id, user_id, role, created_at, updated_at \
             FROM participants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get participant"))?;

        row.map(Participant::try_from).transpose()
    }

    #[instrument(skip(self, conn), fields(user_id = %user_id, room_id = %room_id))]
    async fn find_by_user_in_room(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, room_id, user_id, role, created_at, updated_at \
             FROM participants WHERE user_id = $1 AND room_id = $2",
        )
        .bind(user_id)
        .bind(room_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get participant for user in room"))?;

        row.map(Participant::try_from).transpose()
    }

    #[instrument(skip(self, conn), fields(room_id = %room_id))]
    async fn find_all_in_room(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
    ) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, room_id, user_id, role, created_at, updated_at \
             FROM participants WHERE room_id = $1 ORDER BY id",
        )
        .bind(room_id)
        .fetch_all(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to list participants in room"))?;

        rows.into_iter().map(Participant::try_from).collect()
    }

    #[instrument(skip(self, conn), fields(role = %role, room_id = %room_id))]
    async fn find_all_by_role_in_room(
        &self,
        conn: &mut SqliteConnection,
        role: ParticipantRole,
        room_id: RoomId,
    ) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            "SELECT id, room_id, user_id, role, created_at, updated_at \
             FROM participants WHERE role = $1 AND room_id = $2 ORDER BY id",
        )
        .bind(role.as_str())
        .bind(room_id)
        .fetch_all(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to list participants by role"))?;

        rows.into_iter().map(Participant::try_from).collect()
    }

    #[instrument(skip(self, conn), fields(participant_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: ParticipantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete participant"))?;

        Ok(result.rows_affected() > 0)
    }
}
