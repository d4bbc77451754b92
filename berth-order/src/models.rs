use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use berth_shared::pii::Masked;

/// Order lifecycle. Seats are sold at creation time, so `PendingPayment`
/// already owns its seats ("seats held through checkout").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: Masked<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// The checkout business record. Its seats must have `Sold` reservations
/// pointing back at it; the assembler maintains that invariant on create
/// and cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub event_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub seat_ids: Vec<String>,
    pub ticket_type_id: Uuid,
    pub session_id: String,
    pub customer: CustomerContact,
    pub total_minor: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: Vec<String>,
        ticket_type_id: Uuid,
        session_id: String,
        customer: CustomerContact,
        total_minor: i64,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            event_id,
            trip_id,
            seat_ids,
            ticket_type_id,
            session_id,
            customer,
            total_minor,
            currency,
            status: OrderStatus::PendingPayment,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }
}
