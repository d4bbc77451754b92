use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Order;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence seam for order records. Unlike reservations, orders are only
/// ever written by the operation that owns them, so plain upserts suffice.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, order: &Order) -> Result<(), BoxError>;

    async fn get(&self, id: Uuid) -> Result<Option<Order>, BoxError>;

    /// Full-record upsert of an existing order.
    async fn update(&self, order: &Order) -> Result<(), BoxError>;

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Order>, BoxError>;
}

pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), BoxError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Order>, BoxError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn update(&self, order: &Order) -> Result<(), BoxError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Order>, BoxError> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.event_id == event_id)
            .cloned()
            .collect())
    }
}
