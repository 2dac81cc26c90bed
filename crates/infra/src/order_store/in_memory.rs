use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{ExpectedVersion, OrderId};
use storefront_orders::Order;

use super::r#trait::{OrderFilter, OrderStore};
use crate::error::StoreError;

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, mut order: Order) -> Result<Order, StoreError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        if orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        order.version = 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(orders.get(&id).cloned())
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let mut out: Vec<Order> = orders
            .values()
            .filter(|o| filter.customer_id.is_none_or(|c| o.customer_id == c))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn update(&self, mut order: Order, expected: ExpectedVersion) -> Result<Order, StoreError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let current = orders
            .get(&order.id)
            .ok_or_else(|| StoreError::Conflict(format!("order {} no longer exists", order.id)))?;

        if !expected.matches(current.version) {
            return Err(StoreError::Conflict(format!(
                "order {}: expected {expected:?}, found version {}",
                order.id, current.version
            )));
        }

        order.version = current.version + 1;
        orders.insert(order.id, order.clone());
        Ok(order)
    }
}
