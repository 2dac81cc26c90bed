//! Shared fixtures for service tests.

use std::sync::Arc;

use chrono::Utc;

use storefront_core::{ExpectedVersion, OrderId, UserId};
use storefront_inventory::{InventoryRecord, StockKey};
use storefront_orders::{NewOrderItem, Order, PlaceOrder, ShippingAddress, StatusHistoryEntry};

use crate::audit::{AuditTrail, InMemoryAuditTrail};
use crate::backends::Backends;
use crate::engine::TransitionEngine;
use crate::error::StoreError;
use crate::ledger::InventoryLedger;
use crate::order_store::{InMemoryOrderStore, OrderFilter, OrderStore};

pub(crate) fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Grace Hopper".to_string(),
        line1: "1 Compiler Way".to_string(),
        line2: None,
        city: "Arlington".to_string(),
        region: Some("VA".to_string()),
        postal_code: "22201".to_string(),
        country: "US".to_string(),
    }
}

pub(crate) fn place_cmd(lines: &[(StockKey, i64)]) -> PlaceOrder {
    PlaceOrder {
        order_id: OrderId::new(),
        customer_id: UserId::new(),
        customer_name: "Grace Hopper".to_string(),
        customer_email: "grace@example.com".to_string(),
        currency: "USD".to_string(),
        shipping_address: address(),
        items: lines
            .iter()
            .map(|(key, quantity)| NewOrderItem {
                product_id: key.product_id,
                variant_id: key.variant_id,
                product_name: "Gadget".to_string(),
                quantity: *quantity,
                unit_price: 999,
            })
            .collect(),
        tax: 0,
        shipping: 0,
        discount: 0,
        placed_at: Utc::now(),
    }
}

pub(crate) async fn seed(backends: &Backends, key: StockKey, quantity: i64, backorder: bool) {
    let record = InventoryRecord::new(key, quantity, 2, true, backorder, Utc::now()).unwrap();
    backends.ledger.upsert(record).await.unwrap();
}

/// In-memory backends with a handle on the concrete audit trail.
pub(crate) struct Fixture {
    pub backends: Backends,
    pub engine: TransitionEngine,
    pub audit: Arc<InMemoryAuditTrail>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut backends = Backends::in_memory();
        let audit = Arc::new(InMemoryAuditTrail::new());
        backends.audit = audit.clone();
        Self {
            engine: TransitionEngine::new(backends.clone()),
            backends,
            audit,
        }
    }

    pub async fn place(&self, lines: &[(StockKey, i64)]) -> Order {
        self.engine.place_order(place_cmd(lines)).await.unwrap()
    }

    pub async fn quantity(&self, key: StockKey) -> i64 {
        self.backends.ledger.get(key).await.unwrap().unwrap().quantity
    }
}

/// Order store whose conditional writes always lose the race.
#[derive(Debug, Default)]
pub(crate) struct ConflictingOrderStore {
    inner: InMemoryOrderStore,
}

#[async_trait::async_trait]
impl OrderStore for ConflictingOrderStore {
    async fn insert(&self, order: Order) -> Result<Order, StoreError> {
        self.inner.insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        self.inner.list(filter).await
    }

    async fn update(&self, order: Order, _expected: ExpectedVersion) -> Result<Order, StoreError> {
        Err(StoreError::Conflict(format!("order {} was modified concurrently", order.id)))
    }
}

pub(crate) struct FailingAuditTrail;

#[async_trait::async_trait]
impl AuditTrail for FailingAuditTrail {
    async fn append(&self, _entry: StatusHistoryEntry) -> Result<(), StoreError> {
        Err(StoreError::Backend("audit table unavailable".to_string()))
    }

    async fn list_for_order(&self, _order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Err(StoreError::Backend("audit table unavailable".to_string()))
    }
}
