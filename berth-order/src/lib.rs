pub mod assembler;
pub mod models;
pub mod repository;

pub use assembler::{OrderAssembler, OrderError, ORDER_EVENTS_TOPIC};
pub use models::{CustomerContact, Order, OrderStatus};
pub use repository::{MemoryOrderRepository, OrderRepository};
