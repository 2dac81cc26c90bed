use std::sync::Arc;

use storefront_core::OrderId;
use storefront_orders::StatusHistoryEntry;

use crate::error::StoreError;

/// Append-only audit trail of order and payment status changes.
///
/// Entries are never updated or deleted. `list_for_order` returns entries in
/// ascending `created_at` order.
#[async_trait::async_trait]
pub trait AuditTrail: Send + Sync {
    async fn append(&self, entry: StatusHistoryEntry) -> Result<(), StoreError>;

    async fn list_for_order(&self, order_id: OrderId)
    -> Result<Vec<StatusHistoryEntry>, StoreError>;
}

#[async_trait::async_trait]
impl<A> AuditTrail for Arc<A>
where
    A: AuditTrail + ?Sized,
{
    async fn append(&self, entry: StatusHistoryEntry) -> Result<(), StoreError> {
        (**self).append(entry).await
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        (**self).list_for_order(order_id).await
    }
}
