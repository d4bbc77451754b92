use uuid::Uuid;

/// Emitted whenever a seat changes status (held, released, sold, reclaimed).
/// This is the payload fanned out to SSE subscribers and mirrored to Kafka.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatStatusChangedEvent {
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_id: String,
    /// "FREE" | "RESERVED" | "SOLD"
    pub status: String,
    pub session_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub occurred_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderConfirmedEvent {
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub seat_ids: Vec<String>,
    pub total_minor: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCancelledEvent {
    pub order_id: Uuid,
    pub event_id: Uuid,
    pub seat_ids: Vec<String>,
    pub timestamp: i64,
}
