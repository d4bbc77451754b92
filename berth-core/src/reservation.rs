use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Composite key identifying one reservable unit: a seat on a specific
/// sailing of an event. `trip_id` is None for events without per-trip
/// inventory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_id: String,
}

impl SeatKey {
    pub fn new(event_id: Uuid, trip_id: Option<Uuid>, seat_id: impl Into<String>) -> Self {
        Self {
            event_id,
            trip_id,
            seat_id: seat_id.into(),
        }
    }

    /// Canonical storage key, also used as the Redis key and expiry-index
    /// member: `seat:{event}:{trip|-}:{seat}`.
    pub fn storage_key(&self) -> String {
        match self.trip_id {
            Some(trip) => format!("seat:{}:{}:{}", self.event_id, trip, self.seat_id),
            None => format!("seat:{}:-:{}", self.event_id, self.seat_id),
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Free,
    Reserved,
    Sold,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Free => "FREE",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Sold => "SOLD",
        }
    }
}

impl fmt::Display for SeatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single persisted record per seat key. A seat with no record is free.
///
/// `token` is a fencing token regenerated on every write; store backends
/// compare it (not the whole record) in compare-and-set, which is what makes
/// read-modify-CAS safe against lost updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub key: SeatKey,
    pub status: SeatStatus,
    pub holder_session: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub order_id: Option<Uuid>,
    pub token: Uuid,
}

impl Reservation {
    /// Fresh hold for a session, expiring at `expires_at`.
    pub fn held(key: SeatKey, session_id: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            key,
            status: SeatStatus::Reserved,
            holder_session: Some(session_id.into()),
            expires_at: Some(expires_at),
            order_id: None,
            token: Uuid::new_v4(),
        }
    }

    /// Terminal sold record attached to an order.
    pub fn sold(key: SeatKey, order_id: Uuid, session_id: Option<String>) -> Self {
        Self {
            key,
            status: SeatStatus::Sold,
            holder_session: session_id,
            expires_at: None,
            order_id: Some(order_id),
            token: Uuid::new_v4(),
        }
    }

    /// A reserved record past its expiry. Readers must treat it as free even
    /// before the sweeper physically removes it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.expires_at) {
            (SeatStatus::Reserved, Some(expiry)) => expiry <= now,
            _ => false,
        }
    }

    /// True when this record no longer blocks an acquire at `now`.
    pub fn is_effectively_free(&self, now: DateTime<Utc>) -> bool {
        self.status == SeatStatus::Reserved && self.is_expired(now)
    }

    pub fn is_held_by(&self, session_id: &str) -> bool {
        self.status == SeatStatus::Reserved
            && self.holder_session.as_deref() == Some(session_id)
    }
}
