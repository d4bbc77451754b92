use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use berth_core::{ReservationStore, SeatKey, SeatStatus};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SeatStatusQuery {
    pub trip_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SeatStatusEntry {
    pub seat_id: String,
    pub status: SeatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
}

/// GET /v1/events/{event_id}/seats
///
/// Pull-based source of truth for clients: the full per-seat picture, with
/// expired holds already folded back to free. SSE subscribers reconcile
/// through this after a reconnect.
pub async fn get_seat_status(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<SeatStatusQuery>,
) -> Result<Json<Vec<SeatStatusEntry>>, AppError> {
    let map = state.seatmaps.get_seat_map(event_id)?;
    let now = Utc::now();

    let mut entries = Vec::new();
    for seat_id in map.seat_ids() {
        let key = SeatKey::new(event_id, query.trip_id, seat_id);
        let entry = match state.store.get(&key).await? {
            Some(r) if !r.is_effectively_free(now) => SeatStatusEntry {
                seat_id: seat_id.to_string(),
                status: r.status,
                holder_session_id: r.holder_session,
                hold_expires_at: r.expires_at,
                order_id: r.order_id,
            },
            _ => SeatStatusEntry {
                seat_id: seat_id.to_string(),
                status: SeatStatus::Free,
                holder_session_id: None,
                hold_expires_at: None,
                order_id: None,
            },
        };
        entries.push(entry);
    }

    Ok(Json(entries))
}
