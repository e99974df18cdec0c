use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::booking::{normalize_token, BookingId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HousekeepingRequestId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HousekeepingRequestType {
    Cleaning,
    FreshTowels,
    FreshLinens,
    Amenities,
    Turndown,
    Maintenance,
    Other,
}

impl HousekeepingRequestType {
    pub const ALL: [HousekeepingRequestType; 7] = [
        Self::Cleaning,
        Self::FreshTowels,
        Self::FreshLinens,
        Self::Amenities,
        Self::Turndown,
        Self::Maintenance,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cleaning => "cleaning",
            Self::FreshTowels => "fresh_towels",
            Self::FreshLinens => "fresh_linens",
            Self::Amenities => "amenities",
            Self::Turndown => "turndown",
            Self::Maintenance => "maintenance",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for HousekeepingRequestType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "cleaning" => Ok(Self::Cleaning),
            "freshtowels" | "towels" => Ok(Self::FreshTowels),
            "freshlinens" | "linens" => Ok(Self::FreshLinens),
            "amenities" => Ok(Self::Amenities),
            "turndown" => Ok(Self::Turndown),
            "maintenance" => Ok(Self::Maintenance),
            "other" => Ok(Self::Other),
            _ => Err(DomainError::UnknownVariant {
                kind: "housekeeping request type",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HousekeepingRequestStatus {
    Requested,
    InProgress,
    Completed,
    Cancelled,
}

impl HousekeepingRequestStatus {
    pub const ALL: [HousekeepingRequestStatus; 4] =
        [Self::Requested, Self::InProgress, Self::Completed, Self::Cancelled];
    pub const ACTIVE: [HousekeepingRequestStatus; 2] = [Self::Requested, Self::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Requested | Self::InProgress)
    }
}

impl std::str::FromStr for HousekeepingRequestStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "requested" => Ok(Self::Requested),
            "inprogress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(DomainError::UnknownVariant {
                kind: "housekeeping status",
                value: value.trim().to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingRequest {
    pub id: HousekeepingRequestId,
    pub booking_id: BookingId,
    pub request_type: HousekeepingRequestType,
    pub status: HousekeepingRequestStatus,
    pub request_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl HousekeepingRequest {
    /// Any status may follow any other. `completed_date` tracks whether the
    /// request currently sits in `Completed`.
    pub fn apply_status(&mut self, status: HousekeepingRequestStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_date = match status {
            HousekeepingRequestStatus::Completed => Some(self.completed_date.unwrap_or(now)),
            _ => None,
        };
    }

    pub fn turnaround_minutes(&self) -> Option<i64> {
        self.completed_date.map(|done| (done - self.request_date).num_minutes().max(0))
    }
}

/// Creation payload; ids and timestamps are assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHousekeepingRequest {
    pub booking_id: BookingId,
    pub request_type: HousekeepingRequestType,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{
        HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus,
        HousekeepingRequestType,
    };
    use crate::domain::booking::BookingId;

    fn request() -> HousekeepingRequest {
        HousekeepingRequest {
            id: HousekeepingRequestId(1),
            booking_id: BookingId(1),
            request_type: HousekeepingRequestType::FreshTowels,
            status: HousekeepingRequestStatus::Requested,
            request_date: Utc::now() - Duration::minutes(45),
            completed_date: None,
            notes: None,
        }
    }

    #[test]
    fn completing_sets_completed_date() {
        let mut request = request();
        let now = Utc::now();
        request.apply_status(HousekeepingRequestStatus::Completed, now);

        assert_eq!(request.status, HousekeepingRequestStatus::Completed);
        assert_eq!(request.completed_date, Some(now));
        assert_eq!(request.turnaround_minutes(), Some(45));
    }

    #[test]
    fn non_terminal_status_never_carries_completed_date() {
        let mut request = request();
        request.apply_status(HousekeepingRequestStatus::InProgress, Utc::now());
        assert_eq!(request.completed_date, None);

        request.apply_status(HousekeepingRequestStatus::Completed, Utc::now());
        request.apply_status(HousekeepingRequestStatus::Requested, Utc::now());
        assert_eq!(request.status, HousekeepingRequestStatus::Requested);
        assert_eq!(request.completed_date, None);
    }

    #[test]
    fn cancelled_can_be_reopened() {
        let mut request = request();
        request.apply_status(HousekeepingRequestStatus::Cancelled, Utc::now());
        request.apply_status(HousekeepingRequestStatus::InProgress, Utc::now());
        assert!(request.status.is_active());
    }

    #[test]
    fn request_type_accepts_loose_spellings() {
        assert_eq!(
            "fresh towels".parse::<HousekeepingRequestType>().expect("parse"),
            HousekeepingRequestType::FreshTowels
        );
        assert_eq!(
            "Turndown".parse::<HousekeepingRequestType>().expect("parse"),
            HousekeepingRequestType::Turndown
        );
        assert!("valet".parse::<HousekeepingRequestType>().is_err());
    }
}
