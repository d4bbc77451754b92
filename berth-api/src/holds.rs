use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Duration;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use berth_inventory::FailedSeat;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AcquireRequest {
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_ids: Vec<String>,
    pub session_id: String,
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AcquireResponse {
    pub locked: Vec<String>,
    pub failed: Vec<FailedSeat>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_ids: Vec<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: Vec<String>,
}

/// POST /v1/seats/acquire
///
/// Partial success by design: each seat reports `locked` or
/// `failed(reason)`, and a caller wanting all-or-nothing releases its own
/// winners when any seat failed.
pub async fn acquire_seats(
    State(state): State<AppState>,
    Json(req): Json<AcquireRequest>,
) -> Result<Json<AcquireResponse>, AppError> {
    if req.seat_ids.is_empty() {
        return Err(AppError::Validation("seat_ids must not be empty".into()));
    }
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id is required".into()));
    }

    let rules = &state.business_rules;
    let ttl_minutes = req
        .ttl_minutes
        .unwrap_or(rules.default_hold_ttl_minutes)
        .clamp(1, rules.max_hold_ttl_minutes);

    let outcome = state
        .lock_manager
        .acquire(
            req.event_id,
            req.trip_id,
            &req.seat_ids,
            &req.session_id,
            Duration::minutes(ttl_minutes),
        )
        .await?;

    Ok(Json(AcquireResponse {
        locked: outcome.locked,
        failed: outcome.failed,
    }))
}

/// POST /v1/seats/release
///
/// Releases the session's own holds and silently skips the rest.
pub async fn release_seats(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<ReleaseResponse>, AppError> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id is required".into()));
    }

    let released = state
        .lock_manager
        .release(req.event_id, req.trip_id, &req.seat_ids, &req.session_id)
        .await?;

    Ok(Json(ReleaseResponse { released }))
}

/// GET /v1/events/{event_id}/stream
///
/// At-most-once SSE feed of seat status changes for one event. Missed
/// events are expected (lag, reconnects); clients recover full state via
/// the seat status endpoint.
pub async fn stream_seat_status(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.event_id == event_id => {
                let data = serde_json::to_string(&event).ok()?;
                Some(Ok(Event::default().event("seatStatusChanged").data(data)))
            }
            // Other events, or a lagged receiver: nothing to forward.
            _ => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
