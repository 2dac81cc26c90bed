//! Infrastructure layer: store ports, in-memory and Postgres adapters, and the
//! services that orchestrate them.

pub mod audit;
pub mod backends;
pub mod cart_service;
pub mod carts;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod order_store;

pub use audit::{AuditTrail, InMemoryAuditTrail, PostgresAuditTrail};
pub use backends::{Backends, run_migrations};
pub use cart_service::{CartAddition, CartService, CartView, CartViewLine, add_to_cart_now};
pub use carts::{CartStore, InMemoryCartStore, PostgresCartStore};
pub use engine::{OrderAccess, OrderDetails, TransitionEngine};
pub use error::{ServiceError, StoreError};
pub use ledger::{InMemoryInventoryLedger, InventoryLedger, PostgresInventoryLedger};
pub use notify::{LogNotifier, NotificationPort, RecordingNotifier};
pub use order_store::{InMemoryOrderStore, OrderFilter, OrderStore, PostgresOrderStore};

#[cfg(test)]
mod testing;
