use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use berth_inventory::LockError;
use berth_order::OrderError;
use berth_seatmap::SeatMapError;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    /// Concurrency conflicts carry the offending seat ids so the caller can
    /// pick around them.
    Conflict {
        message: String,
        seat_ids: Vec<String>,
    },
    Internal(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            AppError::Conflict { message, seat_ids } => (
                StatusCode::CONFLICT,
                Json(json!({ "error": message, "seat_ids": seat_ids })),
            )
                .into_response(),
            AppError::Internal(msg) => {
                tracing::error!("internal server error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
            AppError::Anyhow(err) => {
                tracing::error!("internal server error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => AppError::Validation(msg),
            OrderError::NotFound(id) => AppError::NotFound(format!("order not found: {id}")),
            OrderError::Conflict { seat_ids } => AppError::Conflict {
                message: "seats unavailable".to_string(),
                seat_ids,
            },
            OrderError::InvalidTransition { from } => {
                AppError::Validation(format!("order cannot leave state {from:?}"))
            }
            OrderError::SeatMap(e) => e.into(),
            OrderError::Lock(e) => e.into(),
            OrderError::Repository(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::SeatMap(e) => e.into(),
            LockError::Store(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<SeatMapError> for AppError {
    fn from(err: SeatMapError) -> Self {
        match err {
            SeatMapError::NotFound(event) => {
                AppError::NotFound(format!("no seat map for event {event}"))
            }
            SeatMapError::Import(msg) => AppError::Internal(msg),
        }
    }
}

impl From<berth_core::StoreError> for AppError {
    fn from(err: berth_core::StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}
