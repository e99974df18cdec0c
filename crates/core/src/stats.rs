//! Aggregates over a guest's stay: counts per status, turnaround and spend.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::housekeeping::{HousekeepingRequest, HousekeepingRequestStatus};
use crate::domain::room::Room;
use crate::domain::room_service::{RoomServiceOrder, RoomServiceStatus};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingSummary {
    pub total: u64,
    pub active: u64,
    pub by_status: BTreeMap<String, u64>,
    pub average_turnaround_minutes: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomServiceSummary {
    pub total: u64,
    pub active: u64,
    pub by_status: BTreeMap<String, u64>,
    pub delivered_revenue: Decimal,
    pub average_delivered_order_value: Option<Decimal>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub total_nights: i64,
    pub booked_revenue: Decimal,
}

pub fn summarize_housekeeping(requests: &[HousekeepingRequest]) -> HousekeepingSummary {
    let mut by_status = zeroed(HousekeepingRequestStatus::ALL.iter().map(|s| s.as_str()));
    let mut turnaround_total = 0i64;
    let mut turnaround_count = 0i64;

    for request in requests {
        *by_status.entry(request.status.as_str().to_string()).or_default() += 1;
        if request.status == HousekeepingRequestStatus::Completed {
            if let Some(minutes) = request.turnaround_minutes() {
                turnaround_total += minutes;
                turnaround_count += 1;
            }
        }
    }

    HousekeepingSummary {
        total: requests.len() as u64,
        active: requests.iter().filter(|r| r.status.is_active()).count() as u64,
        by_status,
        average_turnaround_minutes: (turnaround_count > 0)
            .then(|| turnaround_total as f64 / turnaround_count as f64),
    }
}

pub fn summarize_room_service(orders: &[RoomServiceOrder]) -> RoomServiceSummary {
    let mut by_status = zeroed(RoomServiceStatus::ALL.iter().map(|s| s.as_str()));
    for order in orders {
        *by_status.entry(order.status.as_str().to_string()).or_default() += 1;
    }

    let delivered = orders
        .iter()
        .filter(|order| order.status == RoomServiceStatus::Delivered)
        .map(|order| order.price)
        .collect::<Vec<_>>();
    let delivered_revenue = saturating_sum(delivered.iter().copied());
    let average_delivered_order_value = (!delivered.is_empty())
        .then(|| (delivered_revenue / Decimal::from(delivered.len() as u64)).round_dp(2));

    RoomServiceSummary {
        total: orders.len() as u64,
        active: orders.iter().filter(|o| o.status.is_active()).count() as u64,
        by_status,
        delivered_revenue,
        average_delivered_order_value,
    }
}

/// Cancelled bookings count towards `by_status` but not nights or revenue.
/// Bookings whose room is missing from `rooms` contribute nights only.
pub fn summarize_bookings(bookings: &[Booking], rooms: &[Room]) -> BookingSummary {
    let prices: BTreeMap<i64, Decimal> =
        rooms.iter().map(|room| (room.id.0, room.price_per_night)).collect();
    let mut by_status = zeroed(BookingStatus::ALL.iter().map(|s| s.as_str()));
    let mut total_nights = 0;
    let mut booked_revenue = Decimal::ZERO;

    for booking in bookings {
        *by_status.entry(booking.status.as_str().to_string()).or_default() += 1;
        if booking.status == BookingStatus::Cancelled {
            continue;
        }
        total_nights += booking.nights();
        if let Some(price) = prices.get(&booking.room_id.0) {
            booked_revenue = saturating_sum([booked_revenue, booking.total_for(*price)]);
        }
    }

    BookingSummary { total: bookings.len() as u64, by_status, total_nights, booked_revenue }
}

fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |total, value| total.checked_add(value).unwrap_or(Decimal::MAX))
}

fn zeroed<'a>(keys: impl Iterator<Item = &'a str>) -> BTreeMap<String, u64> {
    keys.map(|key| (key.to_string(), 0)).collect()
}
