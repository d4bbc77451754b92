use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use berth_core::events::EventSink;
use berth_core::{Reservation, SeatKey, SeatStatus};
use berth_shared::models::events::SeatStatusChangedEvent;

pub const SEAT_STATUS_TOPIC: &str = "seats.status";

/// Single-process fan-out of seat status changes, plus best-effort mirroring
/// to an external event sink (Kafka) when one is configured.
///
/// Delivery is at-most-once: lagging receivers drop events and reconnecting
/// clients must reconcile through the pull-based seat status endpoint. The
/// broadcaster holds no authoritative state.
pub struct StatusBroadcaster {
    tx: broadcast::Sender<SeatStatusChangedEvent>,
    sink: Option<Arc<dyn EventSink>>,
}

impl StatusBroadcaster {
    pub fn new(capacity: usize, sink: Option<Arc<dyn EventSink>>) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, sink }
    }

    /// Subscribers filter by event id themselves; the channel is shared.
    pub fn subscribe(&self) -> broadcast::Receiver<SeatStatusChangedEvent> {
        self.tx.subscribe()
    }

    pub async fn publish(&self, event: SeatStatusChangedEvent) {
        // No receivers is fine; send only fails when nobody is listening.
        let _ = self.tx.send(event.clone());

        if let Some(sink) = &self.sink {
            match serde_json::to_string(&event) {
                Ok(payload) => {
                    if let Err(e) = sink
                        .publish(SEAT_STATUS_TOPIC, &event.event_id.to_string(), &payload)
                        .await
                    {
                        tracing::warn!(
                            seat_id = %event.seat_id,
                            "failed to mirror status event to sink: {e}"
                        );
                    }
                }
                Err(e) => tracing::warn!("failed to serialize status event: {e}"),
            }
        }
    }

    /// Convenience constructor for a status-change payload.
    pub fn status_event(
        key: &SeatKey,
        status: SeatStatus,
        session_id: Option<String>,
        order_id: Option<Uuid>,
    ) -> SeatStatusChangedEvent {
        SeatStatusChangedEvent {
            event_id: key.event_id,
            trip_id: key.trip_id,
            seat_id: key.seat_id.clone(),
            status: status.as_str().to_string(),
            session_id,
            order_id,
            occurred_at: Utc::now().timestamp(),
        }
    }

    /// Payload for a seat going back to free, carrying the session that used
    /// to hold it (if any) so observers can correlate.
    pub fn freed_event(reservation: &Reservation) -> SeatStatusChangedEvent {
        Self::status_event(
            &reservation.key,
            SeatStatus::Free,
            reservation.holder_session.clone(),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let broadcaster = StatusBroadcaster::new(16, None);
        let mut rx = broadcaster.subscribe();

        let key = SeatKey::new(Uuid::new_v4(), None, "1A");
        let event = StatusBroadcaster::status_event(
            &key,
            SeatStatus::Reserved,
            Some("sess-1".to_string()),
            None,
        );
        broadcaster.publish(event).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.seat_id, "1A");
        assert_eq!(received.status, "RESERVED");
        assert_eq!(received.session_id.as_deref(), Some("sess-1"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let broadcaster = StatusBroadcaster::new(4, None);
        let key = SeatKey::new(Uuid::new_v4(), None, "2B");
        broadcaster
            .publish(StatusBroadcaster::status_event(
                &key,
                SeatStatus::Free,
                None,
                None,
            ))
            .await;
    }
}
