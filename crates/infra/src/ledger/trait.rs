use std::sync::Arc;

use storefront_inventory::{Availability, InventoryRecord, StockKey, StockMovement};

use crate::error::StoreError;

/// Stock ledger port.
///
/// `deduct` and `restore` are single atomic read-modify-write operations: two
/// concurrent callers can never both read the same quantity and overwrite each
/// other. Both return `Ok(None)` when no row exists for the key, and leave rows
/// with tracking disabled untouched (the returned movement has `tracked: false`).
///
/// The ledger never rejects an over-deduction; the quantity floors at zero and
/// the caller inspects `StockMovement::shortfall`.
#[async_trait::async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn get(&self, key: StockKey) -> Result<Option<InventoryRecord>, StoreError>;

    /// Create or replace a stock row (administrative seeding).
    async fn upsert(&self, record: InventoryRecord) -> Result<InventoryRecord, StoreError>;

    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    async fn deduct(&self, key: StockKey, quantity: i64)
    -> Result<Option<StockMovement>, StoreError>;

    async fn restore(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError>;

    /// Read-only availability check. `None` when no row exists.
    async fn check_availability(
        &self,
        key: StockKey,
        requested: i64,
    ) -> Result<Option<Availability>, StoreError> {
        Ok(self.get(key).await?.map(|r| r.availability(requested)))
    }
}

#[async_trait::async_trait]
impl<L> InventoryLedger for Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    async fn get(&self, key: StockKey) -> Result<Option<InventoryRecord>, StoreError> {
        (**self).get(key).await
    }

    async fn upsert(&self, record: InventoryRecord) -> Result<InventoryRecord, StoreError> {
        (**self).upsert(record).await
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        (**self).list().await
    }

    async fn deduct(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        (**self).deduct(key, quantity).await
    }

    async fn restore(
        &self,
        key: StockKey,
        quantity: i64,
    ) -> Result<Option<StockMovement>, StoreError> {
        (**self).restore(key, quantity).await
    }

    async fn check_availability(
        &self,
        key: StockKey,
        requested: i64,
    ) -> Result<Option<Availability>, StoreError> {
        (**self).check_availability(key, requested).await
    }
}
