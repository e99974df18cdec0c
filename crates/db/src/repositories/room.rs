use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::room::{Room, RoomId};

use super::{parse_decimal, parse_enum, RepositoryError, RoomRepository};
use crate::DbPool;

pub struct SqlRoomRepository {
    pool: DbPool,
}

impl SqlRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RoomRepository for SqlRoomRepository {
    async fn find_by_id(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, room_number, room_type, price_per_night
             FROM room
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(room_from_row).transpose()
    }

    async fn save(&self, room: Room) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO room (id, room_number, room_type, price_per_night)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                room_number = excluded.room_number,
                room_type = excluded.room_type,
                price_per_night = excluded.price_per_night",
        )
        .bind(room.id.0)
        .bind(&room.room_number)
        .bind(room.room_type.as_str())
        .bind(room.price_per_night.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn room_from_row(row: SqliteRow) -> Result<Room, RepositoryError> {
    Ok(Room {
        id: RoomId(row.try_get("id")?),
        room_number: row.try_get("room_number")?,
        room_type: parse_enum("room_type", row.try_get("room_type")?)?,
        price_per_night: parse_decimal("price_per_night", row.try_get("price_per_night")?)?,
    })
}
