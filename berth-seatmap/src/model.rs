use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One selectable seat. `tickets_per_seat` covers party seats (a table or
/// cabin sold as a unit that admits more than one person).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub coords: Option<SeatCoords>,
    #[serde(default = "default_tickets_per_seat")]
    pub tickets_per_seat: u32,
}

fn default_tickets_per_seat() -> u32 {
    1
}

/// Rendering position, passed through to the storefront untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeatCoords {
    pub x: f32,
    pub y: f32,
}

/// An ordered block of seats sharing a price tier (deck, salon, sun deck...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    /// Category / price-tier identifier, e.g. "UPPER_DECK".
    pub category: String,
    /// Price per ticket in minor currency units.
    pub price_minor: i64,
    pub seats: Vec<Seat>,
}

/// Static seating layout of a vessel for one event. Built by configuration
/// or import; immutable at booking time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatMap {
    pub vessel_id: Uuid,
    pub areas: Vec<Area>,
}

impl SeatMap {
    /// Linear scan over areas; seat maps are small (hundreds of seats).
    pub fn find_area(&self, seat_id: &str) -> Option<&Area> {
        self.areas
            .iter()
            .find(|area| area.seats.iter().any(|seat| seat.id == seat_id))
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.areas
            .iter()
            .flat_map(|area| area.seats.iter())
            .find(|seat| seat.id == seat_id)
    }

    pub fn contains_seat(&self, seat_id: &str) -> bool {
        self.seat(seat_id).is_some()
    }

    /// Price of one seat: the containing area's tier price times the seat's
    /// ticket multiplier. None if the seat does not exist.
    pub fn seat_price_minor(&self, seat_id: &str) -> Option<i64> {
        let area = self.find_area(seat_id)?;
        let seat = area.seats.iter().find(|seat| seat.id == seat_id)?;
        Some(area.price_minor * i64::from(seat.tickets_per_seat))
    }

    pub fn seat_ids(&self) -> impl Iterator<Item = &str> {
        self.areas
            .iter()
            .flat_map(|area| area.seats.iter())
            .map(|seat| seat.id.as_str())
    }
}
