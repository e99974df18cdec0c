use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use concierge_core::domain::booking::BookingId;
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::housekeeping::{
    HousekeepingRequest, HousekeepingRequestId, HousekeepingRequestStatus, NewHousekeepingRequest,
};
use concierge_core::errors::{ApplicationError, DomainError};
use concierge_core::pagination::{Page, PageRequest};
use concierge_db::HousekeepingFilter;
use serde::Deserialize;
use tracing::info;

use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingQuery {
    pub guest_id: Option<i64>,
    pub booking_id: Option<i64>,
    /// Comma-separated statuses.
    pub status: Option<String>,
    pub request_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHousekeepingBody {
    pub booking_id: i64,
    pub request_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<HousekeepingQuery>,
) -> ApiResult<Json<Page<HousekeepingRequest>>> {
    let filter = HousekeepingFilter {
        guest_id: query.guest_id.map(CustomerId),
        booking_id: query.booking_id.map(BookingId),
        statuses: parse_list(query.status.as_deref()).map_err(rejected)?,
        request_type: query
            .request_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(rejected)?,
    };

    let page = state
        .repositories
        .housekeeping
        .list(&filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.housekeeping.list_failed"))?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateHousekeepingBody>,
) -> ApiResult<(StatusCode, Json<HousekeepingRequest>)> {
    let request_type = body.request_type.parse().map_err(rejected)?;
    let created = state
        .repositories
        .housekeeping
        .create(
            NewHousekeepingRequest { booking_id: BookingId(body.booking_id), request_type, notes: body.notes },
            Utc::now(),
        )
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.housekeeping.create_failed"))?;

    info!(
        event_name = "api.housekeeping.created",
        request_id = created.id.0,
        booking_id = created.booking_id.0,
        request_type = created.request_type.as_str(),
        "housekeeping request created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<HousekeepingRequest>> {
    let status: HousekeepingRequestStatus = body.status.parse().map_err(rejected)?;
    let updated = state
        .repositories
        .housekeeping
        .update_status(&HousekeepingRequestId(id), status, Utc::now())
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.housekeeping.update_failed"))?
        .ok_or_else(|| {
            ApiError::from_application(
                ApplicationError::NotFound(format!("housekeeping request {id}")),
                "api.housekeeping.update_failed",
            )
        })?;

    info!(
        event_name = "api.housekeeping.status_updated",
        request_id = id,
        status = updated.status.as_str(),
        "housekeeping request status updated"
    );
    Ok(Json(updated))
}

pub(crate) fn parse_list<T>(raw: Option<&str>) -> Result<Vec<T>, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}

pub(crate) fn rejected(error: DomainError) -> ApiError {
    ApiError::from_application(ApplicationError::Domain(error), "api.request.invalid")
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::api::test_support::{app, send};

    #[tokio::test]
    async fn list_filters_by_guest_and_status() {
        let (app, _stay) = app().await;

        let (status, body) = send(
            &app,
            "GET",
            "/api/Housekeeping?guestId=1&status=requested,in_progress&pageSize=1",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], 2);
        assert_eq!(body["totalPages"], 2);
        assert_eq!(body["items"][0]["id"], 1);
        assert_eq!(body["items"][0]["notes"], "After 2pm please");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let (app, _stay) = app().await;

        let (status, body) = send(&app, "GET", "/api/Housekeeping?status=sparkling", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some_and(|message| message.contains("sparkling")));
    }

    #[tokio::test]
    async fn create_then_complete() {
        let (app, stay) = app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/Housekeeping",
            Some(json!({
                "bookingId": stay.current_booking.id.0,
                "requestType": "fresh_linens",
                "notes": "  "
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["requestType"], "FreshLinens");
        assert_eq!(created["notes"], serde_json::Value::Null);

        let uri = format!("/api/Housekeeping/{}/status", created["id"]);
        let (status, completed) =
            send(&app, "PUT", &uri, Some(json!({ "status": "Completed" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(completed["status"], "Completed");
        assert!(completed["completedDate"].is_string());
    }

    #[tokio::test]
    async fn missing_booking_and_request_are_not_found() {
        let (app, _stay) = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/Housekeeping",
            Some(json!({ "bookingId": 404, "requestType": "cleaning" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Booking 404 not found.");

        let (status, _) =
            send(&app, "PUT", "/api/Housekeeping/999/status", Some(json!({ "status": "cancelled" })))
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
