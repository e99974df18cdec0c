use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite};

use concierge_core::domain::booking::BookingId;
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::housekeeping::{
    HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus,
    NewHousekeepingRequest,
};
use concierge_core::pagination::{Page, PageRequest};

use super::{
    ensure_booking_exists, format_timestamp, parse_enum, parse_optional_timestamp,
    parse_timestamp, HousekeepingFilter, HousekeepingRepository, RepositoryError,
};
use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT hr.id, hr.booking_id, hr.request_type, hr.status,
        hr.request_date, hr.completed_date, hr.notes
     FROM housekeeping_request hr
     JOIN booking b ON b.id = hr.booking_id";

pub struct SqlHousekeepingRepository {
    pool: DbPool,
}

impl SqlHousekeepingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_filtered(
        &self,
        filter: &HousekeepingFilter,
        page: Option<PageRequest>,
    ) -> Result<Vec<HousekeepingRequest>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        push_filter(&mut query, filter);
        query.push(" ORDER BY hr.request_date DESC, hr.id DESC");
        if let Some(page) = page {
            query.push(" LIMIT ");
            query.push_bind(i64::from(page.limit()));
            query.push(" OFFSET ");
            query.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(request_from_row).collect()
    }
}

#[async_trait::async_trait]
impl HousekeepingRepository for SqlHousekeepingRepository {
    async fn find_by_id(
        &self,
        id: &HousekeepingRequestId,
    ) -> Result<Option<HousekeepingRequest>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE hr.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(request_from_row).transpose()
    }

    async fn list(
        &self,
        filter: &HousekeepingFilter,
        page: PageRequest,
    ) -> Result<Page<HousekeepingRequest>, RepositoryError> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM housekeeping_request hr JOIN booking b ON b.id = hr.booking_id",
        );
        push_filter(&mut count_query, filter);
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let items = self.fetch_filtered(filter, Some(page)).await?;
        Ok(Page::new(items, page, u64::try_from(total).unwrap_or_default()))
    }

    async fn list_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<HousekeepingRequest>, RepositoryError> {
        let filter = HousekeepingFilter { guest_id: Some(*guest_id), ..HousekeepingFilter::default() };
        self.fetch_filtered(&filter, None).await
    }

    async fn active_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<HousekeepingRequest>, RepositoryError> {
        let filter = HousekeepingFilter {
            guest_id: Some(*guest_id),
            statuses: HousekeepingRequestStatus::ACTIVE.to_vec(),
            ..HousekeepingFilter::default()
        };
        self.fetch_filtered(&filter, None).await
    }

    async fn create(
        &self,
        request: NewHousekeepingRequest,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingRequest, RepositoryError> {
        ensure_booking_exists(&self.pool, &request.booking_id).await?;

        let notes = request.notes.map(|notes| notes.trim().to_string()).filter(|n| !n.is_empty());
        let inserted = sqlx::query(
            "INSERT INTO housekeeping_request (
                booking_id, request_type, status, request_date, completed_date, notes
             ) VALUES (?, ?, ?, ?, NULL, ?)",
        )
        .bind(request.booking_id.0)
        .bind(request.request_type.as_str())
        .bind(HousekeepingRequestStatus::Requested.as_str())
        .bind(format_timestamp(&now))
        .bind(notes.as_deref())
        .execute(&self.pool)
        .await?;

        let id = HousekeepingRequestId(inserted.last_insert_rowid());
        self.find_by_id(&id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!("housekeeping request {} vanished after insert", id.0))
        })
    }

    async fn update_status(
        &self,
        id: &HousekeepingRequestId,
        status: HousekeepingRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<HousekeepingRequest>, RepositoryError> {
        let Some(mut request) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        request.apply_status(status, now);

        sqlx::query("UPDATE housekeeping_request SET status = ?, completed_date = ? WHERE id = ?")
            .bind(request.status.as_str())
            .bind(request.completed_date.as_ref().map(format_timestamp))
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        self.find_by_id(id).await
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Sqlite>, filter: &HousekeepingFilter) {
    query.push(" WHERE 1=1");

    if let Some(guest_id) = filter.guest_id {
        query.push(" AND b.customer_id = ");
        query.push_bind(guest_id.0);
    }

    if let Some(BookingId(booking_id)) = filter.booking_id {
        query.push(" AND hr.booking_id = ");
        query.push_bind(booking_id);
    }

    if !filter.statuses.is_empty() {
        query.push(" AND hr.status IN (");
        let mut separated = query.separated(", ");
        for status in &filter.statuses {
            separated.push_bind(status.as_str());
        }
        query.push(")");
    }

    if let Some(request_type) = filter.request_type {
        query.push(" AND hr.request_type = ");
        query.push_bind(request_type.as_str());
    }
}

fn request_from_row(row: SqliteRow) -> Result<HousekeepingRequest, RepositoryError> {
    Ok(HousekeepingRequest {
        id: HousekeepingRequestId(row.try_get("id")?),
        booking_id: BookingId(row.try_get("booking_id")?),
        request_type: parse_enum("request_type", row.try_get("request_type")?)?,
        status: parse_enum("status", row.try_get("status")?)?,
        request_date: parse_timestamp("request_date", row.try_get("request_date")?)?,
        completed_date: parse_optional_timestamp("completed_date", row.try_get("completed_date")?)?,
        notes: row.try_get("notes")?,
    })
}
