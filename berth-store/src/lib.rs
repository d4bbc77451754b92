pub mod app_config;
pub mod events;
pub mod memory;
pub mod redis_repo;

pub use events::EventProducer;
pub use memory::MemoryReservationStore;
pub use redis_repo::RedisReservationStore;
