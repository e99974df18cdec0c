//! Deterministic sample data: two guests, three rooms, three bookings and a
//! handful of housekeeping requests and room-service orders.
//!
//! Every record carries fixed ids and timestamps so that tests in any crate
//! can assert on exact values after inserting the dataset into a fresh pool.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use concierge_core::domain::booking::{Booking, BookingId, BookingStatus};
use concierge_core::domain::customer::{Customer, CustomerId};
use concierge_core::domain::housekeeping::{
    HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus,
    HousekeepingRequestType,
};
use concierge_core::domain::room::{Room, RoomId, RoomType};
use concierge_core::domain::room_service::{
    RoomServiceId, RoomServiceOrder, RoomServiceStatus, RoomServiceType,
};

use crate::connection::DbPool;
use crate::repositories::{
    format_timestamp, BookingRepository, CustomerRepository, RepositoryError, RoomRepository,
    SqlBookingRepository, SqlCustomerRepository, SqlRoomRepository,
};

#[derive(Clone, Debug, PartialEq)]
pub struct SampleStay {
    pub guest: Customer,
    pub other_guest: Customer,
    pub rooms: Vec<Room>,
    pub past_booking: Booking,
    pub current_booking: Booking,
    pub other_booking: Booking,
    pub housekeeping: Vec<HousekeepingRequest>,
    pub room_service: Vec<RoomServiceOrder>,
}

impl SampleStay {
    /// Reference instant all sample timestamps are offset from.
    pub fn anchor() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 11, 8, 0, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn build() -> Self {
        let anchor = Self::anchor();
        let guest = Customer {
            id: CustomerId(1),
            first_name: "Maria".to_string(),
            last_name: "Garcia".to_string(),
            email: "maria.garcia@example.com".to_string(),
            phone: Some("+1 555 0101".to_string()),
            created_at: anchor - Duration::days(90),
        };
        let other_guest = Customer {
            id: CustomerId(2),
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john.smith@example.com".to_string(),
            phone: None,
            created_at: anchor - Duration::days(30),
        };

        let rooms = vec![
            room(1, "101", RoomType::Standard, Decimal::new(12_900, 2)),
            room(2, "305", RoomType::Deluxe, Decimal::new(21_950, 2)),
            room(3, "501", RoomType::Suite, Decimal::new(48_000, 2)),
        ];

        let past_booking = Booking {
            id: BookingId(1),
            customer_id: guest.id,
            room_id: RoomId(1),
            check_in_date: date(2026, 3, 1),
            check_out_date: date(2026, 3, 4),
            status: BookingStatus::Completed,
            created_at: anchor - Duration::days(80),
        };
        let current_booking = Booking {
            id: BookingId(2),
            customer_id: guest.id,
            room_id: RoomId(2),
            check_in_date: date(2026, 5, 10),
            check_out_date: date(2026, 5, 14),
            status: BookingStatus::CheckedIn,
            created_at: anchor - Duration::days(20),
        };
        let other_booking = Booking {
            id: BookingId(3),
            customer_id: other_guest.id,
            room_id: RoomId(3),
            check_in_date: date(2026, 5, 9),
            check_out_date: date(2026, 5, 12),
            status: BookingStatus::Confirmed,
            created_at: anchor - Duration::days(10),
        };

        let housekeeping = vec![
            housekeeping(
                1,
                current_booking.id,
                HousekeepingRequestType::Cleaning,
                HousekeepingRequestStatus::Requested,
                anchor + Duration::hours(3),
                None,
                Some("After 2pm please"),
            ),
            housekeeping(
                2,
                current_booking.id,
                HousekeepingRequestType::FreshTowels,
                HousekeepingRequestStatus::InProgress,
                anchor + Duration::hours(2),
                None,
                None,
            ),
            housekeeping(
                3,
                current_booking.id,
                HousekeepingRequestType::Turndown,
                HousekeepingRequestStatus::Completed,
                anchor + Duration::hours(1),
                Some(anchor + Duration::hours(1) + Duration::minutes(45)),
                None,
            ),
            housekeeping(
                4,
                past_booking.id,
                HousekeepingRequestType::Cleaning,
                HousekeepingRequestStatus::Completed,
                anchor - Duration::days(70),
                Some(anchor - Duration::days(70) + Duration::minutes(15)),
                None,
            ),
            housekeeping(
                5,
                other_booking.id,
                HousekeepingRequestType::Amenities,
                HousekeepingRequestStatus::Requested,
                anchor + Duration::hours(4),
                None,
                Some("Extra pillows"),
            ),
        ];

        let room_service = vec![
            order(
                1,
                current_booking.id,
                "Club sandwich",
                RoomServiceType::Food,
                Decimal::new(1_850, 2),
                RoomServiceStatus::Requested,
                anchor + Duration::hours(3),
            ),
            order(
                2,
                current_booking.id,
                "Bottle of Rioja",
                RoomServiceType::Beverage,
                Decimal::new(4_200, 2),
                RoomServiceStatus::InProgress,
                anchor + Duration::hours(2),
            ),
            order(
                3,
                current_booking.id,
                "Continental breakfast",
                RoomServiceType::Food,
                Decimal::new(2_400, 2),
                RoomServiceStatus::Delivered,
                anchor + Duration::hours(1),
            ),
            order(
                4,
                other_booking.id,
                "Shirt pressing",
                RoomServiceType::Laundry,
                Decimal::new(1_500, 2),
                RoomServiceStatus::Requested,
                anchor + Duration::hours(4),
            ),
        ];

        Self {
            guest,
            other_guest,
            rooms,
            past_booking,
            current_booking,
            other_booking,
            housekeeping,
            room_service,
        }
    }

    /// Builds the dataset and writes it into an already migrated pool.
    pub async fn insert(pool: &DbPool) -> Result<Self, RepositoryError> {
        let stay = Self::build();

        let customers = SqlCustomerRepository::new(pool.clone());
        customers.save(stay.guest.clone()).await?;
        customers.save(stay.other_guest.clone()).await?;

        let rooms = SqlRoomRepository::new(pool.clone());
        for room in &stay.rooms {
            rooms.save(room.clone()).await?;
        }

        let bookings = SqlBookingRepository::new(pool.clone());
        for booking in [&stay.past_booking, &stay.current_booking, &stay.other_booking] {
            bookings.save(booking.clone()).await?;
        }

        for request in &stay.housekeeping {
            sqlx::query(
                "INSERT INTO housekeeping_request (
                    id, booking_id, request_type, status, request_date, completed_date, notes
                 ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(request.id.0)
            .bind(request.booking_id.0)
            .bind(request.request_type.as_str())
            .bind(request.status.as_str())
            .bind(format_timestamp(&request.request_date))
            .bind(request.completed_date.as_ref().map(format_timestamp))
            .bind(request.notes.as_deref())
            .execute(pool)
            .await?;
        }

        for order in &stay.room_service {
            sqlx::query(
                "INSERT INTO room_service (
                    id, booking_id, item, service_type, price, status,
                    request_date, delivered_date, notes
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(order.id.0)
            .bind(order.booking_id.0)
            .bind(&order.item)
            .bind(order.service_type.as_str())
            .bind(order.price.to_string())
            .bind(order.status.as_str())
            .bind(format_timestamp(&order.request_date))
            .bind(order.delivered_date.as_ref().map(format_timestamp))
            .bind(order.notes.as_deref())
            .execute(pool)
            .await?;
        }

        Ok(stay)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }
}

fn room(id: i64, number: &str, room_type: RoomType, price_per_night: Decimal) -> Room {
    Room { id: RoomId(id), room_number: number.to_string(), room_type, price_per_night }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn housekeeping(
    id: i64,
    booking_id: BookingId,
    request_type: HousekeepingRequestType,
    status: HousekeepingRequestStatus,
    request_date: DateTime<Utc>,
    completed_date: Option<DateTime<Utc>>,
    notes: Option<&str>,
) -> HousekeepingRequest {
    HousekeepingRequest {
        id: HousekeepingRequestId(id),
        booking_id,
        request_type,
        status,
        request_date,
        completed_date,
        notes: notes.map(str::to_string),
    }
}

fn order(
    id: i64,
    booking_id: BookingId,
    item: &str,
    service_type: RoomServiceType,
    price: Decimal,
    status: RoomServiceStatus,
    request_date: DateTime<Utc>,
) -> RoomServiceOrder {
    RoomServiceOrder {
        id: RoomServiceId(id),
        booking_id,
        item: item.to_string(),
        service_type,
        price,
        status,
        request_date,
        delivered_date: (status == RoomServiceStatus::Delivered)
            .then(|| request_date + Duration::minutes(25)),
        notes: None,
    }
}
