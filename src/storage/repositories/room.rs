//! Room repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

use crate::auth::models::Room;
use crate::domain::RoomId;
use crate::errors::{AnteroomError, Result};
use crate::storage::repositories::is_unique_violation;

/// Database row for rooms.
#[derive(Debug, Clone, FromRow)]
struct RoomRow {
    id: RoomId,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository trait for room rows.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn insert(&self, conn: &mut SqliteConnection, name: &str) -> Result<Room>;

    async fn find_by_id(&self, conn: &mut SqliteConnection, id: RoomId) -> Result<Option<Room>>;

    async fn find_by_name(&self, conn: &mut SqliteConnection, name: &str)
        -> Result<Option<Room>>;

    async fn find_all(&self, conn: &mut SqliteConnection) -> Result<Vec<Room>>;

    /// Rename; returns None when the row no longer exists.
    async fn update_name(
        &self,
        conn: &mut SqliteConnection,
        id: RoomId,
        name: &str,
    ) -> Result<Option<Room>>;

    async fn delete(&self, conn: &mut SqliteConnection, id: RoomId) -> Result<bool>;
}

/// SQLx-based room repository implementation.
#[derive(Debug, Clone, Default)]
pub struct SqlxRoomRepository;

impl SqlxRoomRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RoomRepository for SqlxRoomRepository {
    #[instrument(skip(self, conn), fields(name = %name))]
    async fn insert(&self, conn: &mut SqliteConnection, name: &str) -> Result<Room> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO rooms (name, created_at, updated_at)
            VALUES ($1, $2, $3)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(format!("room name '{}' already exists", name), "room")
            } else {
                AnteroomError::database(e, "Failed to insert room")
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, conn), fields(room_id = %id))]
    async fn find_by_id(&self, conn: &mut SqliteConnection, id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get room"))?;

        Ok(row.map(Room::from))
    }

    #[instrument(skip(self, conn), fields(name = %name))]
    async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, created_at, updated_at FROM rooms WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to get room by name"))?;

        Ok(row.map(Room::from))
    }

    #[instrument(skip(self, conn))]
    async fn find_all(&self, conn: &mut SqliteConnection) -> Result<Vec<Room>> {
        let rows = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, created_at, updated_at FROM rooms ORDER BY name",
        )
        .fetch_all(conn)
        .await
        .map_err(|e| AnteroomError::database(e, "Failed to list rooms"))?;

        Ok(rows.into_iter().map(Room::from).collect())
    }

    #[instrument(skip(self, conn), fields(room_id = %id, name = %name))]
    async fn update_name(
        &self,
        conn: &mut SqliteConnection,
        id: RoomId,
        name: &str,
    ) -> Result<Option<Room>> {
        let row = sqlx::query_as::<_, RoomRow>(
            r#"
            UPDATE rooms SET name = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AnteroomError::duplicated(format!("room name '{}' already exists", name), "room")
            } else {
                AnteroomError::database(e, "Failed to rename room")
            }
        })?;

        Ok(row.map(Room::from))
    }

    #[instrument(skip(self, conn), fields(room_id = %id))]
    async fn delete(&self, conn: &mut SqliteConnection, id: RoomId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AnteroomError::database(e, "Failed to delete room"))?;

        Ok(result.rows_affected() > 0)
    }
}
