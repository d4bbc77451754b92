use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use berth_order::{CustomerContact, Order};
use berth_shared::pii::Masked;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_ids: Vec<String>,
    pub ticket_type_id: Uuid,
    pub customer: CustomerPayload,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhookRequest {
    pub order_id: Uuid,
    pub status: String,
}

/// POST /v1/orders
///
/// Sells the seats all-or-nothing and persists the order. A conflict names
/// the offending seats and leaves everything untouched.
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let customer = CustomerContact {
        name: req.customer.name,
        email: Masked(req.customer.email),
        phone: req.customer.phone,
    };

    let order = state
        .assembler
        .create_order(
            req.event_id,
            req.trip_id,
            &req.seat_ids,
            req.ticket_type_id,
            customer,
            &req.session_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.assembler.get_order(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/orders/{id}/cancel
///
/// Administrative cancellation with compensating release of the seats.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.assembler.cancel_order(order_id).await?;
    Ok(Json(order))
}

/// POST /v1/webhooks/payment
///
/// Payment-succeeded callback from the gateway. Anything other than a
/// success is acknowledged and ignored; the hold TTL and order expiry
/// handle abandoned payments.
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(req): Json<PaymentWebhookRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if req.status != "succeeded" {
        tracing::info!(order_id = %req.order_id, status = %req.status, "ignoring payment webhook");
        return Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "ignored": req.status })),
        ));
    }

    let order = state.assembler.confirm_payment(req.order_id).await?;
    Ok((StatusCode::OK, Json(serde_json::to_value(order).unwrap_or_default())))
}
