use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use berth_core::{CasOutcome, ReservationStore, StoreError};

use crate::broadcast::StatusBroadcaster;
use crate::mirror::ReservationMirror;

/// Background reclaim of TTL-expired holds. Readers already treat expired
/// holds as free; the sweeper just removes the dead records, tells the
/// external provider and announces the seats as free again.
pub struct ExpirySweeper {
    store: Arc<dyn ReservationStore>,
    broadcaster: Arc<StatusBroadcaster>,
    mirror: Arc<ReservationMirror>,
    interval: Duration,
    batch_size: usize,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<dyn ReservationStore>,
        broadcaster: Arc<StatusBroadcaster>,
        mirror: Arc<ReservationMirror>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            broadcaster,
            mirror,
            interval,
            batch_size: 256,
        }
    }

    /// Run forever on a fixed interval. Store failures are logged and
    /// retried on the next tick rather than killing the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
            loop {
                ticker.tick().await;
                match self.sweep_once(Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(reclaimed = n, "swept expired holds"),
                    Err(e) => tracing::error!("sweep failed, retrying next tick: {e}"),
                }
            }
        })
    }

    /// One pass. Idempotent: a record already reclaimed (or re-acquired by a
    /// new session) loses the CAS and is skipped.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired = self.store.scan_expired(now, self.batch_size).await?;
        let mut reclaimed = 0;

        for record in expired {
            // scan_expired only returns reserved records, but re-check; the
            // record may have changed between scan and here.
            if !record.is_expired(now) {
                continue;
            }

            match self
                .store
                .compare_and_set(&record.key, Some(&record), None)
                .await?
            {
                CasOutcome::Committed => {
                    tracing::debug!(key = %record.key, "reclaimed expired hold");
                    if let Some(session) = &record.holder_session {
                        self.mirror
                            .mirror_release(record.key.event_id, session, &record.key.seat_id)
                            .await;
                    }
                    self.broadcaster
                        .publish(StatusBroadcaster::freed_event(&record))
                        .await;
                    reclaimed += 1;
                }
                CasOutcome::Conflict => {
                    // A new session re-acquired the seat first; their hold
                    // stands.
                }
            }
        }

        Ok(reclaimed)
    }
}
