use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use uuid::Uuid;

use berth_core::{Reservation, ReservationStore, SeatKey, SeatStatus};
use berth_inventory::{
    ExpirySweeper, LockManager, ReservationMirror, SellError, StatusBroadcaster,
};
use berth_seatmap::{Area, Seat, SeatMap, SeatMapRegistry};
use berth_store::MemoryReservationStore;

fn seat(id: &str) -> Seat {
    Seat {
        id: id.to_string(),
        label: format!("Seat {id}"),
        coords: None,
        tickets_per_seat: 1,
    }
}

fn fixture(event_id: Uuid) -> (Arc<dyn ReservationStore>, Arc<LockManager>) {
    let mut registry = SeatMapRegistry::new();
    registry.insert(
        event_id,
        SeatMap {
            vessel_id: Uuid::new_v4(),
            areas: vec![Area {
                id: "main".to_string(),
                category: "MAIN_DECK".to_string(),
                price_minor: 2500,
                seats: vec![
                    seat("1A"),
                    seat("2B"),
                    seat("3A"),
                    seat("3B"),
                    seat("4C"),
                ],
            }],
        },
    );

    let store: Arc<dyn ReservationStore> = Arc::new(MemoryReservationStore::new());
    let manager = Arc::new(LockManager::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(StatusBroadcaster::new(64, None)),
        Arc::new(ReservationMirror::disabled()),
    ));
    (store, manager)
}

fn seats(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn racing_acquires_yield_exactly_one_winner() {
    let event_id = Uuid::new_v4();
    let (_, manager) = fixture(event_id);

    let mut handles = Vec::new();
    for i in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            manager
                .acquire(
                    event_id,
                    None,
                    &seats(&["1A"]),
                    &format!("session-{i}"),
                    Duration::minutes(5),
                )
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    let mut losers = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        if outcome.locked == vec!["1A".to_string()] {
            winners += 1;
        } else {
            assert_eq!(outcome.failed.len(), 1);
            assert_eq!(outcome.failed[0].seat_id, "1A");
            losers += 1;
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(losers, 7);
}

#[tokio::test]
async fn acquire_is_partially_successful() {
    let event_id = Uuid::new_v4();
    let (_, manager) = fixture(event_id);

    // Session A takes 1A first.
    manager
        .acquire(event_id, None, &seats(&["1A"]), "A", Duration::minutes(5))
        .await
        .unwrap();

    // Session B asks for a conflicted seat, a free seat and a bogus one.
    let outcome = manager
        .acquire(
            event_id,
            None,
            &seats(&["1A", "2B", "9Z"]),
            "B",
            Duration::minutes(5),
        )
        .await
        .unwrap();

    assert_eq!(outcome.locked, vec!["2B".to_string()]);
    let reasons: Vec<(&str, String)> = outcome
        .failed
        .iter()
        .map(|f| (f.seat_id.as_str(), format!("{:?}", f.reason)))
        .collect();
    assert!(reasons.contains(&("1A", "Conflict".to_string())));
    assert!(reasons.contains(&("9Z", "UnknownSeat".to_string())));
}

#[tokio::test]
async fn reacquiring_own_hold_refreshes_expiry() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);
    let key = SeatKey::new(event_id, None, "2B");

    manager
        .acquire(event_id, None, &seats(&["2B"]), "A", Duration::minutes(1))
        .await
        .unwrap();
    let first = store.get(&key).await.unwrap().unwrap();

    let outcome = manager
        .acquire(event_id, None, &seats(&["2B"]), "A", Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(outcome.locked, vec!["2B".to_string()]);

    let second = store.get(&key).await.unwrap().unwrap();
    assert!(second.expires_at.unwrap() > first.expires_at.unwrap());
}

#[tokio::test]
async fn expired_hold_is_acquirable_by_another_session() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);
    let key = SeatKey::new(event_id, None, "2B");

    // Plant an hour-old hold for A directly in the store.
    let stale = Reservation::held(key.clone(), "A", Utc::now() - Duration::minutes(60));
    store
        .compare_and_set(&key, None, Some(stale))
        .await
        .unwrap();

    let outcome = manager
        .acquire(event_id, None, &seats(&["2B"]), "B", Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(outcome.locked, vec!["2B".to_string()]);

    let current = store.get(&key).await.unwrap().unwrap();
    assert_eq!(current.holder_session.as_deref(), Some("B"));
}

#[tokio::test]
async fn release_only_touches_own_holds() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);

    manager
        .acquire(event_id, None, &seats(&["1A"]), "A", Duration::minutes(5))
        .await
        .unwrap();
    manager
        .acquire(event_id, None, &seats(&["2B"]), "B", Duration::minutes(5))
        .await
        .unwrap();

    // B releases a foreign hold, an own hold and an already-free seat.
    let released = manager
        .release(event_id, None, &seats(&["1A", "2B", "3A"]), "B")
        .await
        .unwrap();
    assert_eq!(released, vec!["2B".to_string()]);

    // A's hold is untouched; releasing again is a no-op.
    let key = SeatKey::new(event_id, None, "1A");
    assert!(store.get(&key).await.unwrap().is_some());
    let released = manager
        .release(event_id, None, &seats(&["2B"]), "B")
        .await
        .unwrap();
    assert!(released.is_empty());
}

#[tokio::test]
async fn sell_is_all_or_nothing_against_sold_seats() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);

    // 3B already belongs to another order.
    let other_order = Uuid::new_v4();
    manager
        .sell(event_id, None, &seats(&["3B"]), other_order, "earlier")
        .await
        .unwrap();

    let order = Uuid::new_v4();
    let err = manager
        .sell(event_id, None, &seats(&["3A", "3B"]), order, "A")
        .await
        .unwrap_err();
    match err {
        SellError::AlreadySold { seat_ids } => assert_eq!(seat_ids, vec!["3B".to_string()]),
        other => panic!("expected AlreadySold, got {other:?}"),
    }

    // 3A was never mutated by the failed batch.
    let key = SeatKey::new(event_id, None, "3A");
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn sell_rejects_live_foreign_hold_but_accepts_own() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);

    manager
        .acquire(event_id, None, &seats(&["1A"]), "A", Duration::minutes(5))
        .await
        .unwrap();
    manager
        .acquire(event_id, None, &seats(&["2B"]), "B", Duration::minutes(5))
        .await
        .unwrap();

    // A sells its own held seat plus one held by B: rejected, naming 2B.
    let err = manager
        .sell(event_id, None, &seats(&["1A", "2B"]), Uuid::new_v4(), "A")
        .await
        .unwrap_err();
    match err {
        SellError::HeldByAnother { seat_ids } => assert_eq!(seat_ids, vec!["2B".to_string()]),
        other => panic!("expected HeldByAnother, got {other:?}"),
    }

    // Selling only the own hold succeeds and is terminal.
    let order = Uuid::new_v4();
    manager
        .sell(event_id, None, &seats(&["1A"]), order, "A")
        .await
        .unwrap();
    let key = SeatKey::new(event_id, None, "1A");
    let record = store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.status, SeatStatus::Sold);
    assert_eq!(record.order_id, Some(order));

    // A sold seat can no longer be acquired.
    let outcome = manager
        .acquire(event_id, None, &seats(&["1A"]), "C", Duration::minutes(5))
        .await
        .unwrap();
    assert!(outcome.locked.is_empty());
}

#[tokio::test]
async fn racing_overlapping_sells_have_one_winner() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);

    let order_a = Uuid::new_v4();
    let order_b = Uuid::new_v4();

    let m1 = manager.clone();
    let m2 = manager.clone();
    let first = tokio::spawn(async move {
        m1.sell(event_id, None, &seats(&["3A", "3B"]), order_a, "A")
            .await
    });
    let second = tokio::spawn(async move {
        m2.sell(event_id, None, &seats(&["3B", "4C"]), order_b, "B")
            .await
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();

    // The overlapping seat 3B is owned by exactly one order.
    let key = SeatKey::new(event_id, None, "3B");
    let record = store.get(&key).await.unwrap().unwrap();
    assert_eq!(record.status, SeatStatus::Sold);

    assert_eq!(winners, 1, "exactly one overlapping sell may succeed");
    // If the loser lost mid-batch, its non-overlapping seat was rolled back.
    if results[1].is_err() {
        let key = SeatKey::new(event_id, None, "4C");
        let leftover = store.get(&key).await.unwrap();
        assert!(leftover.is_none() || leftover.unwrap().order_id == Some(order_b));
    }
}

#[tokio::test]
async fn mid_batch_loss_against_a_freed_seat_reports_contention() {
    use async_trait::async_trait;
    use berth_core::{CasOutcome, StoreError};
    use chrono::DateTime;
    use std::sync::atomic::{AtomicBool, Ordering};

    // Serves one fabricated stale read for a chosen seat, so the sell's
    // phase-two CAS loses against a seat that is actually free.
    struct StaleReadStore {
        inner: MemoryReservationStore,
        stale_seat: String,
        served: AtomicBool,
    }

    #[async_trait]
    impl ReservationStore for StaleReadStore {
        async fn get(&self, key: &SeatKey) -> Result<Option<Reservation>, StoreError> {
            if key.seat_id == self.stale_seat && !self.served.swap(true, Ordering::SeqCst) {
                let ghost =
                    Reservation::held(key.clone(), "ghost", Utc::now() - Duration::minutes(5));
                return Ok(Some(ghost));
            }
            self.inner.get(key).await
        }

        async fn compare_and_set(
            &self,
            key: &SeatKey,
            expected: Option<&Reservation>,
            new: Option<Reservation>,
        ) -> Result<CasOutcome, StoreError> {
            self.inner.compare_and_set(key, expected, new).await
        }

        async fn scan_expired(
            &self,
            now: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<Reservation>, StoreError> {
            self.inner.scan_expired(now, limit).await
        }

        async fn delete(&self, key: &SeatKey) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    let event_id = Uuid::new_v4();
    let mut registry = SeatMapRegistry::new();
    registry.insert(
        event_id,
        SeatMap {
            vessel_id: Uuid::new_v4(),
            areas: vec![Area {
                id: "main".to_string(),
                category: "MAIN_DECK".to_string(),
                price_minor: 2500,
                seats: vec![seat("3A"), seat("3B")],
            }],
        },
    );
    let store = Arc::new(StaleReadStore {
        inner: MemoryReservationStore::new(),
        stale_seat: "3B".to_string(),
        served: AtomicBool::new(false),
    });
    let manager = LockManager::new(
        store.clone(),
        Arc::new(registry),
        Arc::new(StatusBroadcaster::new(16, None)),
        Arc::new(ReservationMirror::disabled()),
    );

    // Phase one reads the ghost hold for 3B (expired, so sellable); the CAS
    // then conflicts because the seat never had a record. The re-read finds
    // it free, which is contention, not a sold or foreign-held seat.
    let err = manager
        .sell(
            event_id,
            None,
            &seats(&["3A", "3B"]),
            Uuid::new_v4(),
            "A",
        )
        .await
        .unwrap_err();
    match err {
        SellError::Contended { seat_ids } => assert_eq!(seat_ids, vec!["3B".to_string()]),
        other => panic!("expected Contended, got {other:?}"),
    }

    // The committed half of the batch was rolled back.
    let key = SeatKey::new(event_id, None, "3A");
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn sweeper_reclaims_only_expired_holds() {
    let event_id = Uuid::new_v4();
    let (store, manager) = fixture(event_id);

    let expired_key = SeatKey::new(event_id, None, "1A");
    let stale = Reservation::held(expired_key.clone(), "A", Utc::now() - Duration::minutes(1));
    store
        .compare_and_set(&expired_key, None, Some(stale))
        .await
        .unwrap();

    manager
        .acquire(event_id, None, &seats(&["2B"]), "B", Duration::minutes(30))
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(
        store.clone(),
        Arc::new(StatusBroadcaster::new(16, None)),
        Arc::new(ReservationMirror::disabled()),
        StdDuration::from_secs(30),
    );

    let reclaimed = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(reclaimed, 1);
    assert!(store.get(&expired_key).await.unwrap().is_none());

    let live_key = SeatKey::new(event_id, None, "2B");
    assert!(store.get(&live_key).await.unwrap().is_some());

    // Idempotent: sweeping again over the cleared keyspace is a no-op.
    let reclaimed = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(reclaimed, 0);
}

#[tokio::test]
async fn sweeper_emits_free_events() {
    let event_id = Uuid::new_v4();
    let (store, _) = fixture(event_id);

    let key = SeatKey::new(event_id, None, "1A");
    let stale = Reservation::held(key.clone(), "A", Utc::now() - Duration::minutes(1));
    store.compare_and_set(&key, None, Some(stale)).await.unwrap();

    let broadcaster = Arc::new(StatusBroadcaster::new(16, None));
    let mut rx = broadcaster.subscribe();
    let sweeper = ExpirySweeper::new(
        store,
        broadcaster,
        Arc::new(ReservationMirror::disabled()),
        StdDuration::from_secs(30),
    );

    sweeper.sweep_once(Utc::now()).await.unwrap();
    let event = rx.recv().await.unwrap();
    assert_eq!(event.seat_id, "1A");
    assert_eq!(event.status, "FREE");
    assert_eq!(event.session_id.as_deref(), Some("A"));
}
