//! Invitation repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::auth::models::Invitation;
use crate::domain::{InvitationId, RoomId, UserId};
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for invitations.
#[derive(Debug, Clone, FromRow)]
struct InvitationRow {
    id: InvitationId,
    room_id: RoomId,
    user_id: UserId,
    code: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvitationRow> for Invitation {
    fn from(row: InvitationRow) -> Self {
        Invitation {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            code: row.code,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository trait for invitation rows.
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
        user_id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation>;

    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: InvitationId,
    ) -> Result<Option<Invitation>>;

    async fn find_by_user_in_room(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Invitation>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: InvitationId) -> Result<bool>;

    /// Delete every invitation into a room; part of the room-deletion cascade.
    async fn delete_all_for_room(&self, conn: &mut SqliteConnection, room_id: RoomId)
        -> Result<u64>;
}

/// SQLx-based invitation repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxInvitationRepository;

impl SqlxInvitationRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InvitationRepository for SqlxInvitationRepository {
    #[instrument(skip(self, conn, code), fields(room_id = %room_id, user_id = %user_id))]
    async fn insert(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
        user_id: UserId,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, InvitationRow>(
            r#"
            INSERT INTO invitations (room_id, user_id, code, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, room_id, user_id, code, expires_at, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .bind(code)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(
                    format!(
                        "an invitation for user {} into room {} already exists",
                        user_id, room_id
                    ),
                    "invitation",
                )
            } else {
                AnteroomError::database(e, "Failed to insert invitation")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn), fields(invitation_id = %id))]
    async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: InvitationId,
    ) -> Result<Option<Invitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(
            "SELECT id, room_id, user_id, code, expires_at, created_at, updated_at \
             FROM invitations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get invitation"))?;

        Ok(row.map(Invitation::from))
    }

    #[instrument(skip(self, conn), fields(user_id = %user_id, room_id = %room_id))]
    async fn find_by_user_in_room(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<Option<Invitation>> {
        let row = sqlx::query_as::<_, InvitationRow>(
            "SELECT id, room_id, user_id, code, expires_at, created_at, updated_at \
             FROM invitations WHERE user_id = $1 AND room_id = $2",
        )
        .bind(user_id)
        .bind(room_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get invitation for user in room"))?;

        Ok(row.map(Invitation::from))
    }

    #[instrument(skip(self, conn), fields(invitation_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: InvitationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invitations WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete invitation"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, conn), fields(room_id = %room_id))]
    async fn delete_all_for_room(
        &self,
        conn: &mut SqliteConnection,
        room_id: RoomId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM invitations WHERE room_id = $1")
            .bind(room_id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete invitations for room"))?;

        Ok(result.rows_affected())
    }
}
