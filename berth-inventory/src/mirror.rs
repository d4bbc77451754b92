use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use berth_core::provider::ProviderClient;

/// Best-effort mirror of local lock decisions to an external reservation
/// system of record. Every call is bounded by a short timeout so a slow
/// third party cannot stall a hold request; timeout or failure is logged at
/// warn level and never rolls back the committed local state.
pub struct ReservationMirror {
    client: Option<Arc<dyn ProviderClient>>,
    call_timeout: Duration,
}

impl ReservationMirror {
    pub fn new(client: Arc<dyn ProviderClient>, call_timeout: Duration) -> Self {
        Self {
            client: Some(client),
            call_timeout,
        }
    }

    /// Deployment without an external provider; every mirror call is a no-op.
    pub fn disabled() -> Self {
        Self {
            client: None,
            call_timeout: Duration::from_secs(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn mirror_hold(&self, event_id: Uuid, session_id: &str, seat_id: &str) {
        self.book(event_id, session_id, seat_id, "hold").await;
    }

    /// The consumed provider interface only knows book/cancel, so a sale
    /// mirrors as a booking too.
    pub async fn mirror_sell(&self, event_id: Uuid, session_id: &str, seat_id: &str) {
        self.book(event_id, session_id, seat_id, "sell").await;
    }

    pub async fn mirror_release(&self, event_id: Uuid, session_id: &str, seat_id: &str) {
        let Some(client) = &self.client else { return };
        match timeout(
            self.call_timeout,
            client.cancel_book_seat(event_id, session_id, seat_id),
        )
        .await
        {
            Ok(Ok(resp)) if resp.success => {}
            Ok(Ok(resp)) => {
                tracing::warn!(%event_id, seat_id, "provider rejected cancel: {}", resp.description);
            }
            Ok(Err(e)) => {
                tracing::warn!(%event_id, seat_id, "provider cancel failed: {e}");
            }
            Err(_) => {
                tracing::warn!(%event_id, seat_id, "provider cancel timed out");
            }
        }
    }

    async fn book(&self, event_id: Uuid, session_id: &str, seat_id: &str, kind: &str) {
        let Some(client) = &self.client else { return };
        match timeout(
            self.call_timeout,
            client.book_seat(event_id, session_id, seat_id),
        )
        .await
        {
            Ok(Ok(resp)) if resp.success => {}
            Ok(Ok(resp)) => {
                tracing::warn!(%event_id, seat_id, kind, "provider rejected booking: {}", resp.description);
            }
            Ok(Err(e)) => {
                tracing::warn!(%event_id, seat_id, kind, "provider booking failed: {e}");
            }
            Err(_) => {
                tracing::warn!(%event_id, seat_id, kind, "provider booking timed out");
            }
        }
    }
}
