use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{normalize_token, BookingId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomServiceId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomServiceType {
    Food,
    Beverage,
    Amenities,
    Laundry,
    Other,
}

impl RoomServiceType {
    pub const ALL: [RoomServiceType; 5] =
        [Self::Food, Self::Beverage, Self::Amenities, Self::Laundry, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Beverage => "beverage",
            Self::Amenities => "amenities",
            Self::Laundry => "laundry",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for RoomServiceType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "food" => Ok(Self::Food),
            "beverage" | "drink" | "drinks" => Ok(Self::Beverage),
            "amenities" | "amenity" => Ok(Self::Amenities),
            "laundry" => Ok(Self::Laundry),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownVariant {
                kind: "room service type",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomServiceStatus {
    Requested,
    InProgress,
    Delivered,
    Cancelled,
}

impl RoomServiceStatus {
    pub const ALL: [RoomServiceStatus; 4] =
        [Self::Requested, Self::InProgress, Self::Delivered, Self::Cancelled];
    pub const ACTIVE: [RoomServiceStatus; 2] = [Self::Requested, Self::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::InProgress => "in_progress",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requested | Self::InProgress)
    }
}

impl std::str::FromStr for RoomServiceStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "requested" => Ok(Self::Requested),
            "inprogress" => Ok(Self::InProgress),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(DomainError::UnknownVariant {
                kind: "room service status",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomServiceOrder {
    pub id: RoomServiceId,
    pub booking_id: BookingId,
    pub item: String,
    pub service_type: RoomServiceType,
    pub price: Decimal,
    pub status: RoomServiceStatus,
    pub request_date: DateTime<Utc>,
    pub delivered_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl RoomServiceOrder {
    /// Free-form transition; `delivered_date` is present only while the order
    /// is `Delivered`.
    pub fn apply_status(&mut self, status: RoomServiceStatus, now: DateTime<Utc>) {
        self.status = status;
        self.delivered_date = match status {
            RoomServiceStatus::Delivered => Some(self.delivered_date.unwrap_or(now)),
            _ => None,
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoomServiceOrder {
    pub booking_id: BookingId,
    pub item: String,
    pub service_type: RoomServiceType,
    pub price: Decimal,
    pub notes: Option<String>,
}

/// Upper bound on a single order's price.
pub const MAX_ORDER_PRICE: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 2);

impl NewRoomServiceOrder {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.item.trim().is_empty() {
            return Err(DomainError::InvariantViolation(
                "room service item must not be empty".to_string(),
            ));
        }
        if self.price.is_sign_negative() {
            return Err(DomainError::InvariantViolation(
                "room service price must not be negative".to_string(),
            ));
        }
        if self.price > MAX_ORDER_PRICE {
            return Err(DomainError::InvariantViolation(format!(
                "room service price must not exceed {MAX_ORDER_PRICE}"
            )));
        }
        Ok(())
    }
}
