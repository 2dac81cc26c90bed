//! Port bundle handed to the services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::audit::{AuditTrail, InMemoryAuditTrail, PostgresAuditTrail};
use crate::carts::{CartStore, InMemoryCartStore, PostgresCartStore};
use crate::error::{StoreError, map_sqlx_error};
use crate::ledger::{InMemoryInventoryLedger, InventoryLedger, PostgresInventoryLedger};
use crate::notify::{LogNotifier, NotificationPort};
use crate::order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Every port the services need, as shared trait objects.
#[derive(Clone)]
pub struct Backends {
    pub orders: Arc<dyn OrderStore>,
    pub ledger: Arc<dyn InventoryLedger>,
    pub audit: Arc<dyn AuditTrail>,
    pub carts: Arc<dyn CartStore>,
    pub notifier: Arc<dyn NotificationPort>,
}

impl Backends {
    /// Fresh, isolated in-memory adapters with the logging notifier.
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryOrderStore::new()),
            ledger: Arc::new(InMemoryInventoryLedger::new()),
            audit: Arc::new(InMemoryAuditTrail::new()),
            carts: Arc::new(InMemoryCartStore::new()),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Postgres adapters sharing one pool, with the logging notifier.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            orders: Arc::new(PostgresOrderStore::new(pool.clone())),
            ledger: Arc::new(PostgresInventoryLedger::new(pool.clone())),
            audit: Arc::new(PostgresAuditTrail::new(pool.clone())),
            carts: Arc::new(PostgresCartStore::new(pool)),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationPort>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Apply the bundled schema. Safe to run repeatedly.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(INIT_SQL)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("run_migrations", e))?;
    tracing::info!("database schema is up to date");
    Ok(())
}
