use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use concierge_core::domain::booking::BookingId;
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::room_service::{
    NewRoomServiceOrder, RoomServiceId, RoomServiceOrder, RoomServiceStatus,
};
use concierge_core::errors::ApplicationError;
use concierge_core::pagination::{Page, PageRequest};
use concierge_db::RoomServiceFilter;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::housekeeping::{parse_list, rejected, StatusBody};
use super::{ApiError, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomServiceQuery {
    pub guest_id: Option<i64>,
    pub booking_id: Option<i64>,
    pub status: Option<String>,
    pub service_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomServiceBody {
    pub booking_id: i64,
    pub item: String,
    pub service_type: String,
    pub price: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoomServiceQuery>,
) -> ApiResult<Json<Page<RoomServiceOrder>>> {
    let filter = RoomServiceFilter {
        guest_id: query.guest_id.map(CustomerId),
        booking_id: query.booking_id.map(BookingId),
        statuses: parse_list(query.status.as_deref()).map_err(rejected)?,
        service_type: query
            .service_type
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(rejected)?,
    };

    let page = state
        .repositories
        .room_service
        .list(&filter, PageRequest::new(query.page, query.page_size))
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.room_service.list_failed"))?;
    Ok(Json(page))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomServiceBody>,
) -> ApiResult<(StatusCode, Json<RoomServiceOrder>)> {
    let service_type = body.service_type.parse().map_err(rejected)?;
    let order = NewRoomServiceOrder {
        booking_id: BookingId(body.booking_id),
        item: body.item,
        service_type,
        price: body.price,
        notes: body.notes,
    };

    let created = state
        .repositories
        .room_service
        .create(order, Utc::now())
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.room_service.create_failed"))?;

    info!(
        event_name = "api.room_service.created",
        order_id = created.id.0,
        booking_id = created.booking_id.0,
        service_type = created.service_type.as_str(),
        "room service order created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<StatusBody>,
) -> ApiResult<Json<RoomServiceOrder>> {
    let status: RoomServiceStatus = body.status.parse().map_err(rejected)?;
    let updated = state
        .repositories
        .room_service
        .update_status(&RoomServiceId(id), status, Utc::now())
        .await
        .map_err(|error| ApiError::from_application(error.into(), "api.room_service.update_failed"))?
        .ok_or_else(|| {
            ApiError::from_application(
                ApplicationError::NotFound(format!("room service order {id}")),
                "api.room_service.update_failed",
            )
        })?;

    info!(
        event_name = "api.room_service.status_updated",
        order_id = id,
        status = updated.status.as_str(),
        "room service order status updated"
    );
    Ok(Json(updated))
}
