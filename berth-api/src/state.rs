use std::sync::Arc;

use berth_core::ReservationStore;
use berth_inventory::{LockManager, StatusBroadcaster};
use berth_order::OrderAssembler;
use berth_seatmap::SeatMapRegistry;
use berth_store::app_config::BusinessRules;
use berth_store::RedisReservationStore;

#[derive(Clone)]
pub struct AppState {
    pub seatmaps: Arc<SeatMapRegistry>,
    pub store: Arc<dyn ReservationStore>,
    pub lock_manager: Arc<LockManager>,
    pub assembler: Arc<OrderAssembler>,
    pub broadcaster: Arc<StatusBroadcaster>,
    /// Present only when the redis backend is configured; the rate limiter
    /// fails open without it.
    pub redis: Option<Arc<RedisReservationStore>>,
    pub business_rules: BusinessRules,
}
