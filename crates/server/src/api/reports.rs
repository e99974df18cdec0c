use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    Json,
};
use concierge_core::domain::customer::{Customer, CustomerId};
use concierge_core::domain::room::RoomId;
use concierge_core::errors::ApplicationError;
use concierge_core::stats::{
    summarize_bookings, summarize_housekeeping, summarize_room_service, BookingSummary,
    HousekeepingSummary, RoomServiceSummary,
};
use serde::Serialize;

use super::{ApiError, ApiResult, AppState};

const EVENT: &str = "api.reports.failed";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestReport {
    pub guest: Customer,
    pub bookings: BookingSummary,
    pub housekeeping: HousekeepingSummary,
    pub room_service: RoomServiceSummary,
}

pub async fn guest_report(
    State(state): State<AppState>,
    Path(guest_id): Path<i64>,
) -> ApiResult<Json<GuestReport>> {
    build_report(&state, CustomerId(guest_id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, EVENT))
}

async fn build_report(
    state: &AppState,
    guest_id: CustomerId,
) -> Result<GuestReport, ApplicationError> {
    let repositories = &state.repositories;
    let guest = repositories
        .customers
        .find_by_id(&guest_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound(format!("guest {}", guest_id.0)))?;

    let bookings = repositories.bookings.list_for_customer(&guest_id, false).await?;
    let room_ids: BTreeSet<i64> = bookings.iter().map(|booking| booking.room_id.0).collect();
    let mut rooms = Vec::with_capacity(room_ids.len());
    for id in room_ids {
        if let Some(room) = repositories.rooms.find_by_id(&RoomId(id)).await? {
            rooms.push(room);
        }
    }

    let housekeeping = repositories.housekeeping.list_for_guest(&guest_id).await?;
    let room_service = repositories.room_service.list_for_guest(&guest_id).await?;

    Ok(GuestReport {
        guest,
        bookings: summarize_bookings(&bookings, &rooms),
        housekeeping: summarize_housekeeping(&housekeeping),
        room_service: summarize_room_service(&room_service),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::{app, send};

    #[tokio::test]
    async fn report_aggregates_the_guest_stay() {
        let (app, _stay) = app().await;

        let (status, body) = send(&app, "GET", "/api/Reports/guest/1", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["guest"]["email"], "maria.garcia@example.com");
        assert_eq!(body["bookings"]["total"], 2);
        assert_eq!(body["bookings"]["totalNights"], 7);
        assert_eq!(body["housekeeping"]["total"], 4);
        assert_eq!(body["housekeeping"]["averageTurnaroundMinutes"], 30.0);
        assert_eq!(body["roomService"]["active"], 2);
        assert_eq!(body["roomService"]["deliveredRevenue"], "24.00");
    }

    #[tokio::test]
    async fn unknown_guest_is_not_found() {
        let (app, _stay) = app().await;

        let (status, body) = send(&app, "GET", "/api/Reports/guest/77", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Guest 77 not found.");
    }
}
