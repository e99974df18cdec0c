use axum::{
    extract::{Path, State},
    Json,
};
use concierge_core::domain::customer::Customer;
use tracing::error;

use super::{ApiError, ApiResult, AppState};

pub async fn customer_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Customer>> {
    match state.repositories.customers.find_by_email(&email).await {
        Ok(Some(customer)) => Ok(Json(customer)),
        Ok(None) => Err(ApiError::not_found("Customer not found.")),
        Err(error) => {
            error!(
                event_name = "api.customer_info.failed",
                error = %error,
                "error retrieving customer information"
            );
            Err(ApiError::internal("An error occurred while retrieving customer information."))
        }
    }
}
