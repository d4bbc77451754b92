pub mod events;
pub mod provider;
pub mod reservation;
pub mod store;

pub use reservation::{Reservation, SeatKey, SeatStatus};
pub use store::{CasOutcome, ReservationStore, StoreError};
