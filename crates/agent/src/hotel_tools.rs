//! Hotel database queries exposed to the agents as callable tools.
//!
//! The orchestrator gets the guest-info tools, the housekeeping agent the
//! housekeeping tools and the room-service agent the room-service tools.
//! Every tool runs on behalf of the guest in the [`ToolContext`]; ids named by
//! the model are checked against that guest through the guardrail policy.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use concierge_core::domain::booking::{Booking, BookingId, BookingStatus};
use concierge_core::domain::customer::CustomerId;
use concierge_core::domain::housekeeping::{
    HousekeepingRequestId, HousekeepingRequestStatus, HousekeepingRequestType,
    NewHousekeepingRequest,
};
use concierge_core::domain::room_service::{
    NewRoomServiceOrder, RoomServiceId, RoomServiceStatus, RoomServiceType,
};
use concierge_core::errors::DomainError;
use concierge_core::pagination::PageRequest;
use concierge_core::stats::{summarize_housekeeping, summarize_room_service};
use concierge_db::{
    BookingRepository, CustomerRepository, DbPool, HousekeepingFilter, HousekeepingRepository,
    RoomRepository, RoomServiceFilter, RoomServiceRepository, SqlBookingRepository,
    SqlCustomerRepository, SqlHousekeepingRepository, SqlRoomRepository,
    SqlRoomServiceRepository,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::guardrails::GuardrailIntent;
use crate::tools::{parse_args, to_output, Tool, ToolContext, ToolError, ToolRegistry};

#[derive(Clone)]
pub struct HotelRepositories {
    pub customers: Arc<dyn CustomerRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub housekeeping: Arc<dyn HousekeepingRepository>,
    pub room_service: Arc<dyn RoomServiceRepository>,
}

impl HotelRepositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            customers: Arc::new(SqlCustomerRepository::new(pool.clone())),
            rooms: Arc::new(SqlRoomRepository::new(pool.clone())),
            bookings: Arc::new(SqlBookingRepository::new(pool.clone())),
            housekeeping: Arc::new(SqlHousekeepingRepository::new(pool.clone())),
            room_service: Arc::new(SqlRoomServiceRepository::new(pool)),
        }
    }
}

pub fn guest_info_tools(repositories: &HotelRepositories) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(GetGuestProfile { repositories: repositories.clone() });
    registry.register(GetGuestBookings { repositories: repositories.clone() });
    registry
}

pub fn housekeeping_tools(repositories: &HotelRepositories) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(GetActiveHousekeepingRequests { repositories: repositories.clone() });
    registry.register(ListHousekeepingRequests { repositories: repositories.clone() });
    registry.register(CreateHousekeepingRequest { repositories: repositories.clone() });
    registry.register(UpdateHousekeepingRequestStatus { repositories: repositories.clone() });
    registry.register(GetHousekeepingSummary { repositories: repositories.clone() });
    registry
}

pub fn room_service_tools(repositories: &HotelRepositories) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(GetActiveRoomServiceOrders { repositories: repositories.clone() });
    registry.register(ListRoomServiceOrders { repositories: repositories.clone() });
    registry.register(CreateRoomServiceOrder { repositories: repositories.clone() });
    registry.register(UpdateRoomServiceOrderStatus { repositories: repositories.clone() });
    registry.register(GetRoomServiceSummary { repositories: repositories.clone() });
    registry
}

// Models send ids as numbers, numeric strings or whole floats.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdArg {
    Number(i64),
    Float(f64),
    Text(String),
}

fn id_value(arg: Option<IdArg>, field: &str) -> Result<Option<i64>, ToolError> {
    match arg {
        None => Ok(None),
        Some(IdArg::Number(value)) => Ok(Some(value)),
        Some(IdArg::Float(value)) if value.fract() == 0.0 => Ok(Some(value as i64)),
        Some(IdArg::Float(value)) => {
            Err(ToolError::InvalidArguments(format!("`{field}` must be a whole number, got {value}")))
        }
        Some(IdArg::Text(text)) => text.trim().parse::<i64>().map(Some).map_err(|_| {
            ToolError::InvalidArguments(format!("`{field}` must be a number, got `{text}`"))
        }),
    }
}

fn required_id(arg: Option<IdArg>, field: &str) -> Result<i64, ToolError> {
    id_value(arg, field)?.ok_or_else(|| ToolError::InvalidArguments(format!("`{field}` is required")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusArg {
    One(String),
    Many(Vec<String>),
}

fn parse_statuses<T>(arg: Option<StatusArg>) -> Result<Vec<T>, ToolError>
where
    T: FromStr<Err = DomainError>,
{
    let raw = match arg {
        None => Vec::new(),
        Some(StatusArg::One(value)) if value.trim().is_empty() => Vec::new(),
        Some(StatusArg::One(value)) => value.split(',').map(str::to_string).collect(),
        Some(StatusArg::Many(values)) => values,
    };
    raw.iter().map(|value| parse_token(value)).collect()
}

fn parse_token<T>(value: &str) -> Result<T, ToolError>
where
    T: FromStr<Err = DomainError>,
{
    value.trim().parse::<T>().map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

fn scoped_guest(context: &ToolContext, arg: Option<IdArg>) -> Result<CustomerId, ToolError> {
    context.scoped_guest(id_value(arg, "guest_id")?.map(CustomerId))
}

fn page_request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
    PageRequest::new(page, page_size)
}

/// Checked-in stay first, then a confirmed stay covering `today`, then the
/// next upcoming one.
fn current_stay(active: Vec<Booking>, today: NaiveDate) -> Option<Booking> {
    let covers_today =
        |booking: &Booking| booking.check_in_date <= today && today < booking.check_out_date;

    if let Some(index) = active.iter().position(|b| b.status == BookingStatus::CheckedIn) {
        return active.into_iter().nth(index);
    }
    if let Some(index) = active.iter().position(covers_today) {
        return active.into_iter().nth(index);
    }
    active.into_iter().min_by_key(|booking| (booking.check_in_date, booking.id.0))
}

/// The booking a new request goes on: the named one, or the guest's current stay.
async fn target_booking(
    repositories: &HotelRepositories,
    context: &ToolContext,
    booking_id: Option<i64>,
) -> Result<Booking, ToolError> {
    let booking = match booking_id {
        Some(id) => repositories
            .bookings
            .find_by_id(&BookingId(id))
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("booking {id}")))?,
        None => {
            let active = repositories.bookings.list_for_customer(&context.guest_id, true).await?;
            current_stay(active, context.now.date_naive())
                .ok_or_else(|| ToolError::NotFound("active booking for this guest".to_string()))?
        }
    };

    context.check(&GuardrailIntent::CreateForBooking {
        session_guest: context.guest_id,
        booking_owner: booking.customer_id,
    })?;

    if !booking.status.is_active() {
        return Err(ToolError::InvalidArguments(format!(
            "booking {} is {} and cannot take new requests",
            booking.id.0,
            booking.status.as_str()
        )));
    }

    Ok(booking)
}

async fn booking_owner(
    repositories: &HotelRepositories,
    booking_id: &BookingId,
) -> Result<CustomerId, ToolError> {
    repositories
        .bookings
        .find_by_id(booking_id)
        .await?
        .map(|booking| booking.customer_id)
        .ok_or_else(|| ToolError::NotFound(format!("booking {}", booking_id.0)))
}

fn guest_id_schema() -> Value {
    json!({
        "type": "integer",
        "description": "Id of the guest. Defaults to the guest in this conversation."
    })
}

fn paging_schema(properties: &mut serde_json::Map<String, Value>) {
    properties.insert(
        "page".to_string(),
        json!({ "type": "integer", "minimum": 1, "description": "1-based page number." }),
    );
    properties.insert(
        "page_size".to_string(),
        json!({ "type": "integer", "minimum": 1, "maximum": 100, "description": "Items per page (default 10)." }),
    );
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": properties, "required": required })
}

// ---------------------------------------------------------------------------
// Guest info
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GuestArgs {
    #[serde(default)]
    guest_id: Option<IdArg>,
}

struct GetGuestProfile {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetGuestProfile {
    fn name(&self) -> &'static str {
        "get_guest_profile"
    }

    fn description(&self) -> &'static str {
        "Look up the guest's profile: name, email, phone and how long they have been a customer."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "guest_id": guest_id_schema() }), &[])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let customer = self
            .repositories
            .customers
            .find_by_id(&guest_id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("guest {}", guest_id.0)))?;

        Ok(json!({
            "guestId": customer.id.0,
            "fullName": customer.full_name(),
            "firstName": customer.first_name,
            "lastName": customer.last_name,
            "email": customer.email,
            "phone": customer.phone,
            "customerSince": customer.created_at.date_naive().to_string(),
        }))
    }
}

#[derive(Deserialize)]
struct GuestBookingsArgs {
    #[serde(default)]
    guest_id: Option<IdArg>,
    #[serde(default)]
    active_only: bool,
}

struct GetGuestBookings {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetGuestBookings {
    fn name(&self) -> &'static str {
        "get_guest_bookings"
    }

    fn description(&self) -> &'static str {
        "List the guest's bookings with room number, room type, dates, nights and total price."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "guest_id": guest_id_schema(),
                "active_only": {
                    "type": "boolean",
                    "description": "Only confirmed or checked-in stays."
                }
            }),
            &[],
        )
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestBookingsArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let bookings =
            self.repositories.bookings.list_for_customer(&guest_id, args.active_only).await?;

        let mut rooms = BTreeMap::new();
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            if !rooms.contains_key(&booking.room_id.0) {
                let room = self.repositories.rooms.find_by_id(&booking.room_id).await?;
                rooms.insert(booking.room_id.0, room);
            }
            let room = rooms.get(&booking.room_id.0).and_then(Option::as_ref);
            views.push(json!({
                "bookingId": booking.id.0,
                "roomNumber": room.map(|room| room.room_number.clone()),
                "roomType": room.map(|room| room.room_type),
                "checkInDate": booking.check_in_date.to_string(),
                "checkOutDate": booking.check_out_date.to_string(),
                "status": booking.status,
                "nights": booking.nights(),
                "total": room.map(|room| booking.total_for(room.price_per_night)),
            }));
        }

        Ok(json!({ "guestId": guest_id.0, "bookings": views }))
    }
}

// ---------------------------------------------------------------------------
// Housekeeping
// ---------------------------------------------------------------------------

struct GetActiveHousekeepingRequests {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetActiveHousekeepingRequests {
    fn name(&self) -> &'static str {
        "get_active_housekeeping_requests"
    }

    fn description(&self) -> &'static str {
        "Get the guest's housekeeping requests that are still requested or in progress, newest first."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "guest_id": guest_id_schema() }), &["guest_id"])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let requests = self.repositories.housekeeping.active_for_guest(&guest_id).await?;
        Ok(json!({ "guestId": guest_id.0, "requests": to_output(&requests)? }))
    }
}

#[derive(Deserialize)]
struct ListHousekeepingArgs {
    #[serde(default)]
    guest_id: Option<IdArg>,
    #[serde(default)]
    status: Option<StatusArg>,
    #[serde(default)]
    request_type: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

struct ListHousekeepingRequests {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for ListHousekeepingRequests {
    fn name(&self) -> &'static str {
        "list_housekeeping_requests"
    }

    fn description(&self) -> &'static str {
        "List the guest's housekeeping requests, optionally filtered by status or request type, one page at a time."
    }

    fn parameters(&self) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert("guest_id".to_string(), guest_id_schema());
        properties.insert(
            "status".to_string(),
            json!({
                "type": "string",
                "description": "Comma-separated statuses: requested, in_progress, completed, cancelled."
            }),
        );
        properties.insert(
            "request_type".to_string(),
            json!({
                "type": "string",
                "enum": HousekeepingRequestType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()
            }),
        );
        paging_schema(&mut properties);
        object_schema(Value::Object(properties), &[])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: ListHousekeepingArgs = parse_args(input)?;
        let filter = HousekeepingFilter {
            guest_id: Some(scoped_guest(context, args.guest_id)?),
            booking_id: None,
            statuses: parse_statuses(args.status)?,
            request_type: args.request_type.as_deref().map(parse_token).transpose()?,
        };
        let page = self
            .repositories
            .housekeeping
            .list(&filter, page_request(args.page, args.page_size))
            .await?;
        to_output(&page)
    }
}

#[derive(Deserialize)]
struct CreateHousekeepingArgs {
    #[serde(default)]
    booking_id: Option<IdArg>,
    request_type: String,
    #[serde(default)]
    notes: Option<String>,
}

struct CreateHousekeepingRequest {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for CreateHousekeepingRequest {
    fn name(&self) -> &'static str {
        "create_housekeeping_request"
    }

    fn description(&self) -> &'static str {
        "Create a housekeeping request for the guest. Uses the guest's current stay unless a booking id is given."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "booking_id": { "type": "integer", "description": "Booking to attach the request to." },
                "request_type": {
                    "type": "string",
                    "enum": HousekeepingRequestType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()
                },
                "notes": { "type": "string", "description": "Details from the guest, such as timing." }
            }),
            &["request_type"],
        )
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: CreateHousekeepingArgs = parse_args(input)?;
        let request_type: HousekeepingRequestType = parse_token(&args.request_type)?;
        let booking_id = id_value(args.booking_id, "booking_id")?;
        let booking = target_booking(&self.repositories, context, booking_id).await?;

        let created = self
            .repositories
            .housekeeping
            .create(
                NewHousekeepingRequest { booking_id: booking.id, request_type, notes: args.notes },
                context.now,
            )
            .await?;
        Ok(json!({ "created": to_output(&created)? }))
    }
}

#[derive(Deserialize)]
struct UpdateStatusArgs {
    #[serde(default, alias = "order_id")]
    request_id: Option<IdArg>,
    status: String,
}

struct UpdateHousekeepingRequestStatus {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for UpdateHousekeepingRequestStatus {
    fn name(&self) -> &'static str {
        "update_housekeeping_request_status"
    }

    fn description(&self) -> &'static str {
        "Change the status of one of the guest's housekeeping requests, for example to cancel it."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "request_id": { "type": "integer" },
                "status": {
                    "type": "string",
                    "enum": HousekeepingRequestStatus::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>()
                }
            }),
            &["request_id", "status"],
        )
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: UpdateStatusArgs = parse_args(input)?;
        let id = HousekeepingRequestId(required_id(args.request_id, "request_id")?);
        let status: HousekeepingRequestStatus = parse_token(&args.status)?;

        let request = self
            .repositories
            .housekeeping
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("housekeeping request {}", id.0)))?;
        let owner = booking_owner(&self.repositories, &request.booking_id).await?;
        context.check(&GuardrailIntent::UpdateStatus {
            session_guest: context.guest_id,
            record_owner: owner,
            cancellation: status == HousekeepingRequestStatus::Cancelled,
        })?;

        let updated = self
            .repositories
            .housekeeping
            .update_status(&id, status, context.now)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("housekeeping request {}", id.0)))?;
        Ok(json!({ "updated": to_output(&updated)? }))
    }
}

struct GetHousekeepingSummary {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetHousekeepingSummary {
    fn name(&self) -> &'static str {
        "get_housekeeping_summary"
    }

    fn description(&self) -> &'static str {
        "Summarize the guest's housekeeping history: counts per status and average turnaround."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "guest_id": guest_id_schema() }), &[])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let requests = self.repositories.housekeeping.list_for_guest(&guest_id).await?;
        to_output(&summarize_housekeeping(&requests))
    }
}

// ---------------------------------------------------------------------------
// Room service
// ---------------------------------------------------------------------------

struct GetActiveRoomServiceOrders {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetActiveRoomServiceOrders {
    fn name(&self) -> &'static str {
        "get_active_room_service_orders"
    }

    fn description(&self) -> &'static str {
        "Get the guest's room service orders that are still requested or in progress, newest first."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "guest_id": guest_id_schema() }), &["guest_id"])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let orders = self.repositories.room_service.active_for_guest(&guest_id).await?;
        Ok(json!({ "guestId": guest_id.0, "orders": to_output(&orders)? }))
    }
}

#[derive(Deserialize)]
struct ListRoomServiceArgs {
    #[serde(default)]
    guest_id: Option<IdArg>,
    #[serde(default)]
    status: Option<StatusArg>,
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    page_size: Option<u32>,
}

struct ListRoomServiceOrders {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for ListRoomServiceOrders {
    fn name(&self) -> &'static str {
        "list_room_service_orders"
    }

    fn description(&self) -> &'static str {
        "List the guest's room service orders, optionally filtered by status or service type, one page at a time."
    }

    fn parameters(&self) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert("guest_id".to_string(), guest_id_schema());
        properties.insert(
            "status".to_string(),
            json!({
                "type": "string",
                "description": "Comma-separated statuses: requested, in_progress, delivered, cancelled."
            }),
        );
        properties.insert(
            "service_type".to_string(),
            json!({
                "type": "string",
                "enum": RoomServiceType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()
            }),
        );
        paging_schema(&mut properties);
        object_schema(Value::Object(properties), &[])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: ListRoomServiceArgs = parse_args(input)?;
        let filter = RoomServiceFilter {
            guest_id: Some(scoped_guest(context, args.guest_id)?),
            booking_id: None,
            statuses: parse_statuses(args.status)?,
            service_type: args.service_type.as_deref().map(parse_token).transpose()?,
        };
        let page = self
            .repositories
            .room_service
            .list(&filter, page_request(args.page, args.page_size))
            .await?;
        to_output(&page)
    }
}

#[derive(Deserialize)]
struct CreateRoomServiceArgs {
    #[serde(default)]
    booking_id: Option<IdArg>,
    item: String,
    service_type: String,
    price: Decimal,
    #[serde(default)]
    notes: Option<String>,
}

struct CreateRoomServiceOrder {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for CreateRoomServiceOrder {
    fn name(&self) -> &'static str {
        "create_room_service_order"
    }

    fn description(&self) -> &'static str {
        "Place a room service order for the guest. Uses the guest's current stay unless a booking id is given."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "booking_id": { "type": "integer", "description": "Booking to charge the order to." },
                "item": { "type": "string", "description": "What the guest ordered." },
                "service_type": {
                    "type": "string",
                    "enum": RoomServiceType::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>()
                },
                "price": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 100000,
                    "description": "Menu price of the item."
                },
                "notes": { "type": "string" }
            }),
            &["item", "service_type", "price"],
        )
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: CreateRoomServiceArgs = parse_args(input)?;
        let service_type: RoomServiceType = parse_token(&args.service_type)?;
        let new_order = NewRoomServiceOrder {
            booking_id: BookingId(0),
            item: args.item,
            service_type,
            price: args.price,
            notes: args.notes,
        };
        new_order.validate().map_err(|error| ToolError::InvalidArguments(error.to_string()))?;

        let booking_id = id_value(args.booking_id, "booking_id")?;
        let booking = target_booking(&self.repositories, context, booking_id).await?;

        let created = self
            .repositories
            .room_service
            .create(NewRoomServiceOrder { booking_id: booking.id, ..new_order }, context.now)
            .await?;
        Ok(json!({ "created": to_output(&created)? }))
    }
}

struct UpdateRoomServiceOrderStatus {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for UpdateRoomServiceOrderStatus {
    fn name(&self) -> &'static str {
        "update_room_service_order_status"
    }

    fn description(&self) -> &'static str {
        "Change the status of one of the guest's room service orders, for example to cancel it."
    }

    fn parameters(&self) -> Value {
        object_schema(
            json!({
                "order_id": { "type": "integer" },
                "status": {
                    "type": "string",
                    "enum": RoomServiceStatus::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>()
                }
            }),
            &["order_id", "status"],
        )
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: UpdateStatusArgs = parse_args(input)?;
        let id = RoomServiceId(required_id(args.request_id, "order_id")?);
        let status: RoomServiceStatus = parse_token(&args.status)?;

        let order = self
            .repositories
            .room_service
            .find_by_id(&id)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("room service order {}", id.0)))?;
        let owner = booking_owner(&self.repositories, &order.booking_id).await?;
        context.check(&GuardrailIntent::UpdateStatus {
            session_guest: context.guest_id,
            record_owner: owner,
            cancellation: status == RoomServiceStatus::Cancelled,
        })?;

        let updated = self
            .repositories
            .room_service
            .update_status(&id, status, context.now)
            .await?
            .ok_or_else(|| ToolError::NotFound(format!("room service order {}", id.0)))?;
        Ok(json!({ "updated": to_output(&updated)? }))
    }
}

struct GetRoomServiceSummary {
    repositories: HotelRepositories,
}

#[async_trait]
impl Tool for GetRoomServiceSummary {
    fn name(&self) -> &'static str {
        "get_room_service_summary"
    }

    fn description(&self) -> &'static str {
        "Summarize the guest's room service orders: counts per status and delivered spend."
    }

    fn parameters(&self) -> Value {
        object_schema(json!({ "guest_id": guest_id_schema() }), &[])
    }

    async fn execute(&self, context: &ToolContext, input: Value) -> Result<Value, ToolError> {
        let args: GuestArgs = parse_args(input)?;
        let guest_id = scoped_guest(context, args.guest_id)?;
        let orders = self.repositories.room_service.list_for_guest(&guest_id).await?;
        to_output(&summarize_room_service(&orders))
    }
}
