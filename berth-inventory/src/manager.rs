use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use berth_core::{CasOutcome, Reservation, ReservationStore, SeatKey, SeatStatus, StoreError};
use berth_seatmap::{SeatMapError, SeatMapRegistry};

use crate::broadcast::StatusBroadcaster;
use crate::mirror::ReservationMirror;

/// Why a single seat was rejected during `acquire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatRejection {
    /// Held by a different, non-expired session (or lost the CAS race).
    Conflict,
    AlreadySold,
    UnknownSeat,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedSeat {
    pub seat_id: String,
    pub reason: SeatRejection,
}

/// Partial-success result of an acquire: seats are processed independently
/// and the storefront lets users pick around the conflicts.
#[derive(Debug, Clone, Serialize)]
pub struct AcquireOutcome {
    pub locked: Vec<String>,
    pub failed: Vec<FailedSeat>,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(transparent)]
    SeatMap(#[from] SeatMapError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Rejection of a whole sell batch. Unlike `acquire`, a sell is
/// all-or-nothing: money is changing hands.
#[derive(Debug, thiserror::Error)]
pub enum SellError {
    #[error("seats already sold: {seat_ids:?}")]
    AlreadySold { seat_ids: Vec<String> },

    #[error("seats held by another session: {seat_ids:?}")]
    HeldByAnother { seat_ids: Vec<String> },

    #[error("unknown seats: {seat_ids:?}")]
    UnknownSeats { seat_ids: Vec<String> },

    /// A seat changed under the batch (lost the CAS race) but was neither
    /// sold nor foreign-held when re-read, e.g. a hold that expired and was
    /// swept mid-sale.
    #[error("seats contended: {seat_ids:?}")]
    Contended { seat_ids: Vec<String> },

    #[error(transparent)]
    SeatMap(#[from] SeatMapError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SellError {
    /// Seat ids the caller can surface in a Conflict response.
    pub fn conflicting_seats(&self) -> &[String] {
        match self {
            SellError::AlreadySold { seat_ids }
            | SellError::HeldByAnother { seat_ids }
            | SellError::UnknownSeats { seat_ids }
            | SellError::Contended { seat_ids } => seat_ids,
            _ => &[],
        }
    }
}

/// Arbitrates concurrent claims on seats. All mutation goes through the
/// store's compare-and-set; there is no lock around the seat map, so two
/// requests for different seats never serialize against each other.
///
/// Tie-break is "first CAS wins": the loser gets a conflict regardless of
/// arrival order. Holds are short-lived, so no queueing or fairness.
pub struct LockManager {
    store: Arc<dyn ReservationStore>,
    seatmaps: Arc<SeatMapRegistry>,
    broadcaster: Arc<StatusBroadcaster>,
    mirror: Arc<ReservationMirror>,
}

impl LockManager {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        seatmaps: Arc<SeatMapRegistry>,
        broadcaster: Arc<StatusBroadcaster>,
        mirror: Arc<ReservationMirror>,
    ) -> Self {
        Self {
            store,
            seatmaps,
            broadcaster,
            mirror,
        }
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    /// Try to hold each seat for `session_id` with the given TTL.
    ///
    /// Free seats, expired holds and the session's own holds are lockable
    /// (re-acquiring your own hold refreshes its expiry). A live foreign
    /// hold or a sold seat rejects that seat only.
    pub async fn acquire(
        &self,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: &[String],
        session_id: &str,
        ttl: Duration,
    ) -> Result<AcquireOutcome, LockError> {
        // Missing seat map means a free-seating event: nothing is lockable,
        // rejected at the boundary before any state is touched.
        let map = self.seatmaps.get_seat_map(event_id)?;

        let mut locked = Vec::new();
        let mut failed = Vec::new();

        for seat_id in seat_ids {
            if !map.contains_seat(seat_id) {
                failed.push(FailedSeat {
                    seat_id: seat_id.clone(),
                    reason: SeatRejection::UnknownSeat,
                });
                continue;
            }

            let key = SeatKey::new(event_id, trip_id, seat_id.clone());
            let now = Utc::now();
            let current = self.store.get(&key).await?;

            let expected = match &current {
                None => None,
                Some(r) if r.status == SeatStatus::Sold => {
                    failed.push(FailedSeat {
                        seat_id: seat_id.clone(),
                        reason: SeatRejection::AlreadySold,
                    });
                    continue;
                }
                Some(r) if r.is_held_by(session_id) || r.is_expired(now) => Some(r),
                Some(_) => {
                    failed.push(FailedSeat {
                        seat_id: seat_id.clone(),
                        reason: SeatRejection::Conflict,
                    });
                    continue;
                }
            };

            let hold = Reservation::held(key.clone(), session_id, now + ttl);
            match self.store.compare_and_set(&key, expected, Some(hold)).await? {
                CasOutcome::Committed => {
                    tracing::debug!(%key, session_id, "seat locked");
                    self.broadcaster
                        .publish(StatusBroadcaster::status_event(
                            &key,
                            SeatStatus::Reserved,
                            Some(session_id.to_string()),
                            None,
                        ))
                        .await;
                    self.mirror.mirror_hold(event_id, session_id, seat_id).await;
                    locked.push(seat_id.clone());
                }
                CasOutcome::Conflict => {
                    failed.push(FailedSeat {
                        seat_id: seat_id.clone(),
                        reason: SeatRejection::Conflict,
                    });
                }
            }
        }

        Ok(AcquireOutcome { locked, failed })
    }

    /// Release what's mine: seats not held by this session are silently
    /// skipped, so release is idempotent.
    pub async fn release(
        &self,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: &[String],
        session_id: &str,
    ) -> Result<Vec<String>, LockError> {
        let mut released = Vec::new();

        for seat_id in seat_ids {
            let key = SeatKey::new(event_id, trip_id, seat_id.clone());
            let Some(current) = self.store.get(&key).await? else {
                continue;
            };
            if !current.is_held_by(session_id) {
                continue;
            }

            match self
                .store
                .compare_and_set(&key, Some(&current), None)
                .await?
            {
                CasOutcome::Committed => {
                    self.broadcaster
                        .publish(StatusBroadcaster::freed_event(&current))
                        .await;
                    self.mirror
                        .mirror_release(event_id, session_id, seat_id)
                        .await;
                    released.push(seat_id.clone());
                }
                // Someone else changed the record between read and CAS;
                // whatever it is now, it is no longer ours to release.
                CasOutcome::Conflict => {}
            }
        }

        Ok(released)
    }

    /// Transition a batch of seats to sold, attaching `order_id`.
    ///
    /// All-or-nothing: every seat is pre-checked before any is mutated, and
    /// a mid-batch CAS conflict rolls back the seats committed by this call.
    /// A live hold by a *different* session blocks the sale; the selling
    /// session's own holds, expired holds and free seats are sellable.
    pub async fn sell(
        &self,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: &[String],
        order_id: Uuid,
        session_id: &str,
    ) -> Result<(), SellError> {
        let map = self.seatmaps.get_seat_map(event_id)?;

        let unknown: Vec<String> = seat_ids
            .iter()
            .filter(|id| !map.contains_seat(id))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(SellError::UnknownSeats { seat_ids: unknown });
        }

        // Phase 1: read everything and reject the whole batch before any
        // seat is mutated.
        let now = Utc::now();
        let mut priors: Vec<(SeatKey, Option<Reservation>)> = Vec::with_capacity(seat_ids.len());
        let mut already_sold = Vec::new();
        let mut foreign_holds = Vec::new();

        for seat_id in seat_ids {
            let key = SeatKey::new(event_id, trip_id, seat_id.clone());
            let current = self.store.get(&key).await?;
            match &current {
                Some(r) if r.status == SeatStatus::Sold && r.order_id != Some(order_id) => {
                    already_sold.push(seat_id.clone());
                }
                Some(r)
                    if r.status == SeatStatus::Reserved
                        && !r.is_expired(now)
                        && !r.is_held_by(session_id) =>
                {
                    foreign_holds.push(seat_id.clone());
                }
                _ => priors.push((key, current)),
            }
        }

        if !already_sold.is_empty() {
            return Err(SellError::AlreadySold {
                seat_ids: already_sold,
            });
        }
        if !foreign_holds.is_empty() {
            return Err(SellError::HeldByAnother {
                seat_ids: foreign_holds,
            });
        }

        // Phase 2: guarded batch commit with rollback on a mid-batch
        // conflict. CAS against the record read in phase 1, so anything that
        // moved in between surfaces as a conflict here.
        let mut committed: Vec<(Reservation, Option<Reservation>)> = Vec::new();

        for (key, prior) in priors {
            // Idempotent re-commit for the same order.
            if let Some(r) = &prior {
                if r.status == SeatStatus::Sold && r.order_id == Some(order_id) {
                    continue;
                }
            }

            let sold = Reservation::sold(key.clone(), order_id, Some(session_id.to_string()));
            match self
                .store
                .compare_and_set(&key, prior.as_ref(), Some(sold.clone()))
                .await
            {
                Ok(CasOutcome::Committed) => committed.push((sold, prior)),
                Ok(CasOutcome::Conflict) => {
                    self.rollback_sell(&committed).await;
                    return Err(self.classify_mid_batch_conflict(&key, session_id).await);
                }
                Err(e) => {
                    self.rollback_sell(&committed).await;
                    return Err(e.into());
                }
            }
        }

        for (sold, _) in &committed {
            self.broadcaster
                .publish(StatusBroadcaster::status_event(
                    &sold.key,
                    SeatStatus::Sold,
                    Some(session_id.to_string()),
                    Some(order_id),
                ))
                .await;
            self.mirror
                .mirror_sell(event_id, session_id, &sold.key.seat_id)
                .await;
        }

        Ok(())
    }

    /// Undo seats this sell call already committed. Each restore CASes
    /// against the sold record we just wrote, so a concurrent administrative
    /// change wins and is merely logged.
    async fn rollback_sell(&self, committed: &[(Reservation, Option<Reservation>)]) {
        for (sold, prior) in committed {
            match self
                .store
                .compare_and_set(&sold.key, Some(sold), prior.clone())
                .await
            {
                Ok(CasOutcome::Committed) => {}
                Ok(CasOutcome::Conflict) => {
                    tracing::error!(key = %sold.key, "sell rollback lost a race, record left as-is");
                }
                Err(e) => {
                    tracing::error!(key = %sold.key, "sell rollback failed: {e}");
                }
            }
        }
    }

    /// Re-read the seat that lost the CAS and name the rejection after what
    /// is actually there now. A seat that is free (or expired-held) at
    /// re-read still lost the race, but it is neither sold nor held.
    async fn classify_mid_batch_conflict(&self, key: &SeatKey, session_id: &str) -> SellError {
        let seat_ids = vec![key.seat_id.clone()];
        match self.store.get(key).await {
            Ok(Some(r)) if r.status == SeatStatus::Sold => SellError::AlreadySold { seat_ids },
            Ok(Some(r)) if !r.is_expired(Utc::now()) && !r.is_held_by(session_id) => {
                SellError::HeldByAnother { seat_ids }
            }
            Ok(_) => SellError::Contended { seat_ids },
            Err(e) => e.into(),
        }
    }

    /// Compensating release for an administrative cancel: drops the sold
    /// record of `order_id` for each seat and announces the seat as free.
    /// Seats not sold to this order are left alone.
    pub async fn release_sold(
        &self,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: &[String],
        order_id: Uuid,
    ) -> Result<Vec<String>, LockError> {
        let mut released = Vec::new();

        for seat_id in seat_ids {
            let key = SeatKey::new(event_id, trip_id, seat_id.clone());
            let Some(current) = self.store.get(&key).await? else {
                continue;
            };
            if current.status != SeatStatus::Sold || current.order_id != Some(order_id) {
                continue;
            }

            if self
                .store
                .compare_and_set(&key, Some(&current), None)
                .await?
                == CasOutcome::Committed
            {
                self.broadcaster
                    .publish(StatusBroadcaster::freed_event(&current))
                    .await;
                if let Some(session) = &current.holder_session {
                    self.mirror.mirror_release(event_id, session, seat_id).await;
                }
                released.push(seat_id.clone());
            }
        }

        Ok(released)
    }
}
