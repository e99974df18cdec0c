use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::booking::{Booking, BookingId, BookingStatus};
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::room::RoomId;

use super::{
    format_date, format_timestamp, parse_date, parse_enum, parse_timestamp, BookingRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, room_id, check_in_date, check_out_date, status, created_at
             FROM booking
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(booking_from_row).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
        active_only: bool,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let rows = if active_only {
            sqlx::query(
                "SELECT id, customer_id, room_id, check_in_date, check_out_date, status, created_at
                 FROM booking
                 WHERE customer_id = ? AND status IN (?, ?)
                 ORDER BY check_in_date DESC, id DESC",
            )
            .bind(customer_id.0)
            .bind(BookingStatus::Confirmed.as_str())
            .bind(BookingStatus::CheckedIn.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, customer_id, room_id, check_in_date, check_out_date, status, created_at
                 FROM booking
                 WHERE customer_id = ?
                 ORDER BY check_in_date DESC, id DESC",
            )
            .bind(customer_id.0)
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn save(&self, booking: Booking) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO booking (
                id, customer_id, room_id, check_in_date, check_out_date, status, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                customer_id = excluded.customer_id,
                room_id = excluded.room_id,
                check_in_date = excluded.check_in_date,
                check_out_date = excluded.check_out_date,
                status = excluded.status",
        )
        .bind(booking.id.0)
        .bind(booking.customer_id.0)
        .bind(booking.room_id.0)
        .bind(format_date(&booking.check_in_date))
        .bind(format_date(&booking.check_out_date))
        .bind(booking.status.as_str())
        .bind(format_timestamp(&booking.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn booking_from_row(row: SqliteRow) -> Result<Booking, RepositoryError> {
    Ok(Booking {
        id: BookingId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        room_id: RoomId(row.try_get("room_id")?),
        check_in_date: parse_date("check_in_date", row.try_get("check_in_date")?)?,
        check_out_date: parse_date("check_out_date", row.try_get("check_out_date")?)?,
        status: parse_enum("status", row.try_get("status")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
