use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use berth_core::events::EventSink;
use berth_inventory::{LockError, LockManager, SellError};
use berth_seatmap::{SeatMapError, SeatMapRegistry};
use berth_shared::models::events::{OrderCancelledEvent, OrderConfirmedEvent};

use crate::models::{CustomerContact, Order, OrderStatus};
use crate::repository::OrderRepository;

pub const ORDER_EVENTS_TOPIC: &str = "orders.lifecycle";

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("order not found: {0}")]
    NotFound(Uuid),

    #[error("seats unavailable: {seat_ids:?}")]
    Conflict { seat_ids: Vec<String> },

    #[error("invalid order transition from {from:?}")]
    InvalidTransition { from: OrderStatus },

    #[error(transparent)]
    SeatMap(#[from] SeatMapError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("order store failure: {0}")]
    Repository(String),
}

/// Converts locked seats plus customer data into an order, transitioning the
/// seats from held to sold. The sell precedes payment confirmation: seats
/// stay owned by the order all the way through checkout.
pub struct OrderAssembler {
    lock_manager: Arc<LockManager>,
    seatmaps: Arc<SeatMapRegistry>,
    orders: Arc<dyn OrderRepository>,
    sink: Option<Arc<dyn EventSink>>,
    currency: String,
}

impl OrderAssembler {
    pub fn new(
        lock_manager: Arc<LockManager>,
        seatmaps: Arc<SeatMapRegistry>,
        orders: Arc<dyn OrderRepository>,
        sink: Option<Arc<dyn EventSink>>,
        currency: String,
    ) -> Self {
        Self {
            lock_manager,
            seatmaps,
            orders,
            sink,
            currency,
        }
    }

    pub fn orders(&self) -> &Arc<dyn OrderRepository> {
        &self.orders
    }

    /// Price the seats, sell them all-or-nothing, persist the order.
    ///
    /// On a sell conflict nothing has been written; on an order-store
    /// failure after a successful sell the seats are released again so the
    /// order↔reservation invariant never dangles.
    pub async fn create_order(
        &self,
        event_id: Uuid,
        trip_id: Option<Uuid>,
        seat_ids: &[String],
        ticket_type_id: Uuid,
        customer: CustomerContact,
        session_id: &str,
    ) -> Result<Order, OrderError> {
        if seat_ids.is_empty() {
            return Err(OrderError::Validation("no seats selected".into()));
        }
        if session_id.trim().is_empty() {
            return Err(OrderError::Validation("missing session id".into()));
        }
        if customer.name.trim().is_empty() || customer.email.inner().trim().is_empty() {
            return Err(OrderError::Validation(
                "customer name and email are required".into(),
            ));
        }

        // Resolve every seat's price tier up front; pricing failures must
        // reject before any reservation is touched.
        let map = self.seatmaps.get_seat_map(event_id)?;
        let mut total_minor: i64 = 0;
        for seat_id in seat_ids {
            match map.seat_price_minor(seat_id) {
                Some(price) => total_minor += price,
                None => {
                    return Err(OrderError::Validation(format!("unknown seat: {seat_id}")));
                }
            }
        }

        let order_id = Uuid::new_v4();
        self.lock_manager
            .sell(event_id, trip_id, seat_ids, order_id, session_id)
            .await
            .map_err(|e| match e {
                SellError::AlreadySold { seat_ids }
                | SellError::HeldByAnother { seat_ids }
                | SellError::Contended { seat_ids } => OrderError::Conflict { seat_ids },
                SellError::UnknownSeats { seat_ids } => {
                    OrderError::Validation(format!("unknown seats: {seat_ids:?}"))
                }
                SellError::SeatMap(e) => OrderError::SeatMap(e),
                SellError::Store(e) => OrderError::Lock(LockError::Store(e)),
            })?;

        let order = Order::new(
            order_id,
            event_id,
            trip_id,
            seat_ids.to_vec(),
            ticket_type_id,
            session_id.to_string(),
            customer,
            total_minor,
            self.currency.clone(),
        );

        if let Err(e) = self.orders.create(&order).await {
            // Compensate: the seats were sold but the order cannot be
            // recorded, so give them back before surfacing the failure.
            tracing::error!(%order_id, "order persist failed, releasing seats: {e}");
            if let Err(release_err) = self
                .lock_manager
                .release_sold(event_id, trip_id, seat_ids, order_id)
                .await
            {
                tracing::error!(%order_id, "compensating release failed: {release_err}");
            }
            return Err(OrderError::Repository(e.to_string()));
        }

        tracing::info!(%order_id, seats = seat_ids.len(), total_minor, "order created");
        Ok(order)
    }

    /// Payment-succeeded callback. Reservations are already `Sold`; only the
    /// order record moves. Idempotent for an already-confirmed order.
    pub async fn confirm_payment(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.fetch(order_id).await?;
        match order.status {
            OrderStatus::PendingPayment => {
                order.update_status(OrderStatus::Confirmed);
                self.persist(&order).await?;
                tracing::info!(%order_id, "payment confirmed");
                self.emit(
                    order_id,
                    &OrderConfirmedEvent {
                        order_id,
                        event_id: order.event_id,
                        seat_ids: order.seat_ids.clone(),
                        total_minor: order.total_minor,
                        timestamp: Utc::now().timestamp(),
                    },
                )
                .await;
                Ok(order)
            }
            OrderStatus::Confirmed => Ok(order),
            ref from => Err(OrderError::InvalidTransition { from: from.clone() }),
        }
    }

    /// Administrative cancellation: the one path that reverts `Sold`.
    /// Releases every seat of the order (locally and on the external
    /// mirror) and marks the order cancelled. Idempotent.
    ///
    /// The seats are released before the status flips: a store failure
    /// mid-cancel leaves the order in its prior state so a retry runs the
    /// release again instead of short-circuiting on `Cancelled`. The retry
    /// of an already-cancelled order re-runs the release too; it is a no-op
    /// once the seats are gone.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.fetch(order_id).await?;
        if order.status == OrderStatus::Cancelled {
            self.lock_manager
                .release_sold(order.event_id, order.trip_id, &order.seat_ids, order_id)
                .await?;
            return Ok(order);
        }

        let released = self
            .lock_manager
            .release_sold(order.event_id, order.trip_id, &order.seat_ids, order_id)
            .await?;

        order.update_status(OrderStatus::Cancelled);
        self.persist(&order).await?;
        tracing::info!(%order_id, released = released.len(), "order cancelled, seats freed");
        self.emit(
            order_id,
            &OrderCancelledEvent {
                order_id,
                event_id: order.event_id,
                seat_ids: order.seat_ids.clone(),
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

        Ok(order)
    }

    /// Best-effort mirror of an order lifecycle event to the external sink;
    /// a publish failure never fails the order operation itself.
    async fn emit<E: serde::Serialize>(&self, order_id: Uuid, event: &E) {
        let Some(sink) = &self.sink else { return };
        match serde_json::to_string(event) {
            Ok(payload) => {
                if let Err(e) = sink
                    .publish(ORDER_EVENTS_TOPIC, &order_id.to_string(), &payload)
                    .await
                {
                    tracing::warn!(%order_id, "failed to publish order event: {e}");
                }
            }
            Err(e) => tracing::warn!(%order_id, "failed to serialize order event: {e}"),
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.fetch(order_id).await
    }

    async fn fetch(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get(order_id)
            .await
            .map_err(|e| OrderError::Repository(e.to_string()))?
            .ok_or(OrderError::NotFound(order_id))
    }

    async fn persist(&self, order: &Order) -> Result<(), OrderError> {
        self.orders
            .update(order)
            .await
            .map_err(|e| OrderError::Repository(e.to_string()))
    }
}
