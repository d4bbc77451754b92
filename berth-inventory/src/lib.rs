pub mod broadcast;
pub mod manager;
pub mod mirror;
pub mod sweeper;

pub use broadcast::StatusBroadcaster;
pub use manager::{AcquireOutcome, FailedSeat, LockError, LockManager, SeatRejection, SellError};
pub use mirror::ReservationMirror;
pub use sweeper::ExpirySweeper;
