use std::sync::Arc;

use storefront_core::{ExpectedVersion, OrderId, UserId};
use storefront_orders::Order;

use crate::error::StoreError;

/// Listing filter. `customer_id: None` lists every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<UserId>,
}

impl OrderFilter {
    pub fn customer(customer_id: UserId) -> Self {
        Self {
            customer_id: Some(customer_id),
        }
    }
}

/// Order store port.
///
/// Orders carry a `version`. `insert` stores version 1; every successful
/// `update` increments it. `update` is conditional on `expected` and fails with
/// `StoreError::Conflict` when the stored version differs or the order is gone.
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<Order, StoreError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError>;

    /// Persist the mutable order fields and item fulfillment statuses.
    async fn update(&self, order: Order, expected: ExpectedVersion) -> Result<Order, StoreError>;
}

#[async_trait::async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        (**self).insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        (**self).get(id).await
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        (**self).list(filter).await
    }

    async fn update(&self, order: Order, expected: ExpectedVersion) -> Result<Order, StoreError> {
        (**self).update(order, expected).await
    }
}
