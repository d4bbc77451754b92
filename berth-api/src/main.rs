use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use berth_api::{app, AppState};
use berth_core::events::EventSink;
use berth_core::ReservationStore;
use berth_inventory::{ExpirySweeper, LockManager, ReservationMirror, StatusBroadcaster};
use berth_order::{MemoryOrderRepository, OrderAssembler};
use berth_seatmap::SeatMapRegistry;
use berth_store::app_config::{Config, StoreBackend};
use berth_store::{EventProducer, MemoryReservationStore, RedisReservationStore};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "berth_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Berth API on port {}", config.server.port);

    let seatmaps = match &config.seatmaps {
        Some(maps) => Arc::new(
            SeatMapRegistry::from_json_file(&maps.path).expect("Failed to load seat maps"),
        ),
        None => Arc::new(SeatMapRegistry::new()),
    };
    tracing::info!(events = seatmaps.len(), "seat map registry loaded");

    let mut redis = None;
    let store: Arc<dyn ReservationStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryReservationStore::new()),
        StoreBackend::Redis => {
            let url = config
                .redis
                .as_ref()
                .map(|r| r.url.clone())
                .expect("redis backend selected but no [redis] config");
            let client =
                Arc::new(RedisReservationStore::new(&url).expect("Failed to connect to Redis"));
            redis = Some(client.clone());
            client
        }
    };

    let sink: Option<Arc<dyn EventSink>> = match &config.kafka {
        Some(kafka) => Some(Arc::new(
            EventProducer::new(&kafka.brokers).expect("Failed to create Kafka producer"),
        )),
        None => None,
    };

    let broadcaster = Arc::new(StatusBroadcaster::new(
        config.business_rules.broadcast_capacity,
        sink.clone(),
    ));

    // No external reservation provider is wired in this binary; deployments
    // mirroring to one construct the mirror with their ProviderClient here.
    let mirror = Arc::new(ReservationMirror::disabled());

    let lock_manager = Arc::new(LockManager::new(
        store.clone(),
        seatmaps.clone(),
        broadcaster.clone(),
        mirror.clone(),
    ));
    let assembler = Arc::new(OrderAssembler::new(
        lock_manager.clone(),
        seatmaps.clone(),
        Arc::new(MemoryOrderRepository::new()),
        sink,
        config.business_rules.currency.clone(),
    ));

    ExpirySweeper::new(
        store.clone(),
        broadcaster.clone(),
        mirror,
        Duration::from_secs(config.business_rules.sweep_interval_seconds),
    )
    .spawn();

    let app_state = AppState {
        seatmaps,
        store,
        lock_manager,
        assembler,
        broadcaster,
        redis,
        business_rules: config.business_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
