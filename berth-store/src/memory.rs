use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use berth_core::{CasOutcome, Reservation, ReservationStore, SeatKey, StoreError};

/// In-process reservation store for tests and single-instance deployments.
/// The map mutex is only held across one compare-and-swap, never across I/O,
/// so contention stays per-operation rather than per-request.
pub struct MemoryReservationStore {
    map: Mutex<HashMap<SeatKey, Reservation>>,
}

impl MemoryReservationStore {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.map.lock().await.len()
    }
}

impl Default for MemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn get(&self, key: &SeatKey) -> Result<Option<Reservation>, StoreError> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn compare_and_set(
        &self,
        key: &SeatKey,
        expected: Option<&Reservation>,
        new: Option<Reservation>,
    ) -> Result<CasOutcome, StoreError> {
        let mut map = self.map.lock().await;

        let matches = match (map.get(key), expected) {
            (None, None) => true,
            (Some(current), Some(expected)) => current.token == expected.token,
            _ => false,
        };
        if !matches {
            return Ok(CasOutcome::Conflict);
        }

        match new {
            Some(record) => {
                map.insert(key.clone(), record);
            }
            None => {
                map.remove(key);
            }
        }
        Ok(CasOutcome::Committed)
    }

    async fn scan_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Reservation>, StoreError> {
        let map = self.map.lock().await;
        Ok(map
            .values()
            .filter(|r| r.is_expired(now))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &SeatKey) -> Result<(), StoreError> {
        self.map.lock().await.remove(key);
        Ok(())
    }
}
