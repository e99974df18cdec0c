use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::room::RoomId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    CheckedIn,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] =
        [Self::Confirmed, Self::CheckedIn, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// A booking the guest can still raise requests against.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Confirmed | Self::CheckedIn)
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "checkedin" => Ok(Self::CheckedIn),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(DomainError::UnknownVariant {
                kind: "booking status",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub room_id: RoomId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days().max(0)
    }

    /// Saturates at `Decimal::MAX` instead of overflowing.
    pub fn total_for(&self, price_per_night: Decimal) -> Decimal {
        price_per_night.checked_mul(Decimal::from(self.nights())).unwrap_or(Decimal::MAX)
    }
}

/// Lowercases and strips separators so `InProgress`, `in_progress` and
/// `in progress` all compare equal.
pub(crate) fn normalize_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{Booking, BookingId, BookingStatus};
    use crate::domain::customer::CustomerId;
    use crate::domain::room::RoomId;

    fn booking(check_in: (i32, u32, u32), check_out: (i32, u32, u32)) -> Booking {
        Booking {
            id: BookingId(1),
            customer_id: CustomerId(1),
            room_id: RoomId(1),
            check_in_date: NaiveDate::from_ymd_opt(check_in.0, check_in.1, check_in.2)
                .expect("valid check-in"),
            check_out_date: NaiveDate::from_ymd_opt(check_out.0, check_out.1, check_out.2)
                .expect("valid check-out"),
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn nights_and_total_follow_date_range() {
        let stay = booking((2026, 3, 1), (2026, 3, 4));
        assert_eq!(stay.nights(), 3);
        assert_eq!(stay.total_for(Decimal::new(12_950, 2)), Decimal::new(38_850, 2));
    }

    #[test]
    fn total_saturates_for_absurd_nightly_prices() {
        let stay = booking((2026, 3, 1), (2026, 3, 4));
        assert_eq!(stay.total_for(Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn inverted_range_counts_zero_nights() {
        let stay = booking((2026, 3, 4), (2026, 3, 1));
        assert_eq!(stay.nights(), 0);
        assert_eq!(stay.total_for(Decimal::new(10_000, 2)), Decimal::ZERO);
    }

    #[test]
    fn status_parses_display_and_storage_forms() {
        assert_eq!("CheckedIn".parse::<BookingStatus>().expect("parse"), BookingStatus::CheckedIn);
        assert_eq!("checked_in".parse::<BookingStatus>().expect("parse"), BookingStatus::CheckedIn);
        assert_eq!("canceled".parse::<BookingStatus>().expect("parse"), BookingStatus::Cancelled);
        assert!("vacant".parse::<BookingStatus>().is_err());
    }
}
