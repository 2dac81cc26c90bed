use std::sync::RwLock;

use storefront_core::OrderId;
use storefront_orders::StatusHistoryEntry;

use super::r#trait::AuditTrail;
use crate::error::StoreError;

/// In-memory audit trail for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditTrail {
    entries: RwLock<Vec<StatusHistoryEntry>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, in append order.
    pub fn all(&self) -> Vec<StatusHistoryEntry> {
        self.entries.read().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AuditTrail for InMemoryAuditTrail {
    async fn append(&self, entry: StatusHistoryEntry) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        entries.push(entry);
        Ok(())
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let mut out: Vec<_> = entries
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect();
        // Stable: entries appended in the same instant keep append order.
        out.sort_by_key(|e| e.created_at);
        Ok(out)
    }
}
