use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use storefront_inventory::{InventoryRecord, StockKey, StockMovement};

use super::r#trait::InventoryLedger;
use crate::error::StoreError;

/// In-memory ledger for tests/dev.
///
/// Every read-modify-write runs under a single mutex guard.
#[derive(Debug, Default)]
pub struct InMemoryInventoryLedger {
    rows: Mutex<HashMap<StockKey, InventoryRecord>>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_row<T>(
        &self,
        key: StockKey,
        f: impl FnOnce(&mut InventoryRecord) -> T,
    ) -> Result<Option<T>, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(rows.get_mut(&key).map(f))
    }
}

#[async_trait::async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn get(&self, key: StockKey) -> Result<Option<InventoryRecord>, StoreError> {
        self.with_row(key, |r| r.clone())
    }

    async fn upsert(&self, record: InventoryRecord) -> Result<InventoryRecord, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        rows.insert(record.key, record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        let mut out: Vec<_> = rows.values().cloned().collect();
        out.sort_by_key(|r| r.key);
        Ok(out)
    }

    async fn deduct(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        let now = Utc::now();
        self.with_row(key, |r| r.deduct(quantity, now))
    }

    async fn restore(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        let now = Utc::now();
        self.with_row(key, |r| r.restore(quantity, now))
    }
}
