use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use concierge_core::domain::booking::{Booking, BookingId};
use concierge_core::domain::customer::{Customer, CustomerId};
use concierge_core::domain::housekeeping::{
    HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus,
    HousekeepingRequestType, NewHousekeepingRequest,
};
use concierge_core::domain::room::{Room, RoomId};
use concierge_core::domain::room_service::{
    NewRoomServiceOrder, RoomServiceId, RoomServiceOrder, RoomServiceStatus, RoomServiceType,
};
use concierge_core::errors::{ApplicationError, DomainError};
use concierge_core::pagination::{Page, PageRequest};

pub mod booking;
pub mod customer;
pub mod housekeeping;
pub mod room;
pub mod room_service;

pub use booking::SqlBookingRepository;
pub use customer::SqlCustomerRepository;
pub use housekeeping::SqlHousekeepingRepository;
pub use room::SqlRoomRepository;
pub use room_service::SqlRoomServiceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(what) => ApplicationError::NotFound(what),
            RepositoryError::Invalid(error) => ApplicationError::Domain(error),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Narrowing for housekeeping listings. Empty `statuses` means any status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HousekeepingFilter {
    pub guest_id: Option<CustomerId>,
    pub booking_id: Option<BookingId>,
    pub statuses: Vec<HousekeepingRequestStatus>,
    pub request_type: Option<HousekeepingRequestType>,
}

/// Narrowing for room-service listings. Empty `statuses` means any status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomServiceFilter {
    pub guest_id: Option<CustomerId>,
    pub booking_id: Option<BookingId>,
    pub statuses: Vec<RoomServiceStatus>,
    pub service_type: Option<RoomServiceType>,
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: &RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn save(&self, room: Room) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
        active_only: bool,
    ) -> Result<Vec<Booking>, RepositoryError>;
    async fn save(&self, booking: Booking) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait HousekeepingRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &HousekeepingRequestId,
    ) -> Result<Option<HousekeepingRequest>, RepositoryError>;

    /// Newest first by `request_date`.
    async fn list(
        &self,
        filter: &HousekeepingFilter,
        page: PageRequest,
    ) -> Result<Page<HousekeepingRequest>, RepositoryError>;

    /// Every request on the guest's bookings, newest first.
    async fn list_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<HousekeepingRequest>, RepositoryError>;

    /// Requested or in-progress requests on the guest's bookings, newest first.
    async fn active_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<HousekeepingRequest>, RepositoryError>;

    async fn create(
        &self,
        request: NewHousekeepingRequest,
        now: DateTime<Utc>,
    ) -> Result<HousekeepingRequest, RepositoryError>;

    /// Returns `None` when no request has the given id.
    async fn update_status(
        &self,
        id: &HousekeepingRequestId,
        status: HousekeepingRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<HousekeepingRequest>, RepositoryError>;
}

#[async_trait]
pub trait RoomServiceRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &RoomServiceId,
    ) -> Result<Option<RoomServiceOrder>, RepositoryError>;

    async fn list(
        &self,
        filter: &RoomServiceFilter,
        page: PageRequest,
    ) -> Result<Page<RoomServiceOrder>, RepositoryError>;

    async fn list_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<RoomServiceOrder>, RepositoryError>;

    async fn active_for_guest(
        &self,
        guest_id: &CustomerId,
    ) -> Result<Vec<RoomServiceOrder>, RepositoryError>;

    async fn create(
        &self,
        order: NewRoomServiceOrder,
        now: DateTime<Utc>,
    ) -> Result<RoomServiceOrder, RepositoryError>;

    async fn update_status(
        &self,
        id: &RoomServiceId,
        status: RoomServiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<RoomServiceOrder>, RepositoryError>;
}

/// Fixed-width UTC so that TEXT ordering matches chronological ordering.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_date(column: &str, value: String) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|error| {
        RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value.trim()).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_enum<T>(column: &str, value: String) -> Result<T, RepositoryError>
where
    T: FromStr<Err = DomainError>,
{
    value.parse::<T>().map_err(|error| RepositoryError::Decode(format!("`{column}`: {error}")))
}

pub(crate) async fn ensure_booking_exists(
    pool: &crate::DbPool,
    booking_id: &BookingId,
) -> Result<(), RepositoryError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM booking WHERE id = ?")
        .bind(booking_id.0)
        .fetch_optional(pool)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(RepositoryError::NotFound(format!("booking {}", booking_id.0))),
    }
}
