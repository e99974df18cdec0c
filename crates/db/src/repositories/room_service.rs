use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use concierge_core::domain::booking::BookingId;
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::room_service::{
    NewRoomServiceOrder, RoomServiceId, RoomServiceOrder, RoomServiceStatus,
};
use concierge_core::pagination::{Page, PageRequest};

use super::{
    ensure_booking_exists, format_timestamp, parse_decimal, parse_enum, parse_optional_timestamp,
    parse_timestamp, RepositoryError, RoomServiceFilter, RoomServiceRepository,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT rs.id, rs.booking_id, rs.item, rs.service_type, rs.price,
        rs.status, rs.request_date, rs.delivered_date, rs.notes
     FROM room_service rs
     JOIN booking b ON b.id = rs.booking_id";

pub struct SqlRoomServiceRepository {
    pool: DbPool,
}

impl SqlRoomServiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_filtered(
        &self,
        filter: &RoomServiceFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<RoomServiceOrder>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filter(&mut query, filter);
        query.push(" ORDER BY rs.request_date DESC, rs.id DESC");
        if let Some(page) = page {
            query.push(" LIMIT ");
            query.push_bind(i64::from(page.limit()));
            query.push(" OFFSET ");
            query.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(order_from_row).collect()
    }
}

#[async_trait::async_trait]
impl RoomServiceRepository for SqlRoomServiceRepository {
    async fn find_by_id(
        &self,
        id: &RoomServiceId,
    ) -> Result<Option<RoomServiceOrder>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE rs.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(order_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &RoomServiceFilter,
        page: PageRequest,
    ) -> Result<Page<RoomServiceOrder>, RepositoryError> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM room_service rs JOIN booking b ON b.id = rs.booking_id",
        );
        push_filter(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let items = self.fetch_filtered(filter, Some(page)).await?;
        Ok(Page::new(items, page, u64::try_from(total).unwrap_or_default()))
    }

    async fn list_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<RoomServiceOrder>, RepositoryError> {
        let filter = RoomServiceFilter { guest_id: Some(*guest_id), ..RoomServiceFilter::default() };
        self.fetch_filtered(&filter, None).await
    }

    async fn active_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<RoomServiceOrder>, RepositoryError> {
        let filter = RoomServiceFilter {
            guest_id: Some(*guest_id),
            statuses: RoomServiceStatus::ACTIVE.to_vec(),
            ..RoomServiceFilter::default()
        };
        self.fetch_filtered(&filter, None).await
    }

    async fn create(
        &self,
        order: NewRoomServiceOrder,
        now: DateTime<Utc>,
    ) -> Result<RoomServiceOrder, RepositoryError> {
        order.validate()?;
        ensure_booking_exists(&self.pool, &order.booking_id).await?;

        let notes = order.notes.map(|notes| notes.trim().to_string()).filter(|n| !n.is_empty());
        let inserted = sqlx::query(
            "INSERT INTO room_service (
                booking_id, item, service_type, price, status, request_date, delivered_date, notes
             ) VALUES (?, ?, ?, ?, ?, ?, NULL, ?)",
        )
        .bind(order.booking_id.0)
        .bind(order.item.trim())
        .bind(order.service_type.as_str())
        .bind(order.price.to_string())
        .bind(RoomServiceStatus::Requested.as_str())
        .bind(format_timestamp(&now))
        .bind(notes.as_deref())
        .execute(&self.pool)
        .await?;

        let id = RoomServiceId(inserted.last_insert_rowid());
        self.find_by_id(&id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("room service order {} vanished after insert", id.0))
        })
    }

    async fn update_status(
        &self,
        id: &RoomServiceId,
        status: RoomServiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<RoomServiceOrder>, RepositoryError> {
        let Some(mut order) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        order.apply_status(status, now);

        sqlx::query("UPDATE room_service SET status = ?, delivered_date = ? WHERE id = ?")
            .bind(order.status.as_str())
            .bind(order.delivered_date.as_ref().map(format_timestamp))
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id).await
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &RoomServiceFilter) {
    query.push(" WHERE 1=1");

    if let Some(guest_id) = filter.guest_id {
        query.push(" AND b.customer_id = ");
        query.push_bind(guest_id.0);
    }

    if let Some(BookingId(booking_id)) = filter.booking_id {
        query.push(" AND rs.booking_id = ");
        query.push_bind(booking_id);
    }

    if !filter.statuses.is_empty() {
        query.push(" AND rs.status IN (");
        let mut separated = query.separated(", ");
        for status in &filter.statuses {
            separated.push_bind(status.as_str());
        }
        query.push(")");
    }

    if let Some(service_type) = filter.service_type {
        query.push(" AND rs.service_type = ");
        query.push_bind(service_type.as_str());
    }
}

fn order_from_row(row: SqliteRow) -> Result<RoomServiceOrder, RepositoryError> {
    Ok(RoomServiceOrder {
        id: RoomServiceId(row.try_get("id")?),
        booking_id: BookingId(row.try_get("booking_id")?),
        item: row.try_get("item")?,
        service_type: parse_enum("service_type", row.try_get("service_type")?)?,
        price: parse_decimal("price", row.try_get("price")?)?,
        status: parse_enum("status", row.try_get("status")?)?,
        request_date: parse_timestamp("request_date", row.try_get("request_date")?)?,
        delivered_date: parse_optional_timestamp("delivered_date", row.try_get("delivered_date")?)?,
        notes: row.try_get("notes")?,
    })
}
