use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::reservation::{Reservation, SeatKey};

/// Outcome of a conditional write. `Conflict` means the expected prior state
/// did not match: a concurrent writer got there first. Callers must treat it
/// as "seat unavailable", never retry silently for the same seat/session
/// without re-reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Committed,
    Conflict,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Backend(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Authoritative mapping from seat key to current reservation.
///
/// `compare_and_set` is the single primitive every higher-level operation
/// goes through; it is the enforcement point of the one-owner-per-seat
/// invariant. Backends compare the fencing token of the current record
/// against `expected` and commit atomically.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// `None` means the seat is free.
    async fn get(&self, key: &SeatKey) -> Result<Option<Reservation>, StoreError>;

    /// Conditionally replace the record at `key`.
    ///
    /// `expected = None` expects the key to be absent; `new = None` deletes.
    async fn compare_and_set(
        &self,
        key: &SeatKey,
        expected: Option<&Reservation>,
        new: Option<Reservation>,
    ) -> Result<CasOutcome, StoreError>;

    /// Reserved records whose expiry has passed, for the sweeper. At most
    /// `limit` records per call; the sweeper loops on its next tick anyway.
    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Unconditional removal. Only administrative compensation uses this;
    /// everything else deletes through `compare_and_set`.
    async fn delete(&self, key: &SeatKey) -> Result<(), StoreError>;
}
