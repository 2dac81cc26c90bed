//! Order lifecycle orchestration.
//!
//! `TransitionEngine` is the only writer of order status. For every change it:
//!
//! ```text
//! load order (NotFound)
//!   ↓
//! plan (pure: legality, next state, inventory effect from the previous status)
//!   ↓
//! apply stock movements through the ledger, one per (product, variant)
//!   ↓
//! write the order, conditional on the loaded version
//!   ↓                         ↘ conflict / failure: reverse the applied movements
//! append audit entries (best-effort)
//!   ↓
//! spawn the customer notification (detached, best-effort)
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{Instrument, instrument};

use storefront_core::{ExpectedVersion, OrderId, UserId};
use storefront_inventory::{MovementKind, StockMovement};
use storefront_orders::{
    InventoryEffect, NotificationKind, Order, OrderSnapshot, OrderStatus, OrderUpdate, PlaceOrder,
    StatusHistoryEntry, TransitionPlan, plan_cancellation, plan_update,
};

use crate::audit::AuditTrail;
use crate::backends::Backends;
use crate::error::{ServiceError, StoreError};
use crate::ledger::InventoryLedger;
use crate::order_store::{OrderFilter, OrderStore};

/// Which orders a caller may see or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAccess {
    /// Staff with elevated permissions.
    Any,
    /// A customer, restricted to their own orders.
    OwnedBy(UserId),
}

impl OrderAccess {
    pub fn permits(&self, order: &Order) -> bool {
        match self {
            OrderAccess::Any => true,
            OrderAccess::OwnedBy(user) => order.is_owned_by(*user),
        }
    }
}

/// An order with its audit history, oldest entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub history: Vec<StatusHistoryEntry>,
}

pub struct TransitionEngine {
    backends: Backends,
}

impl TransitionEngine {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Validate and store a new `pending` order. No inventory effect.
    #[instrument(skip(self, cmd), fields(order_id = %cmd.order_id, customer_id = %cmd.customer_id), err)]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order, ServiceError> {
        let order = Order::place(cmd)?;
        let order = self.backends.orders.insert(order).await?;
        tracing::info!(order_number = %order.order_number, items = order.items.len(), "order placed");
        Ok(order)
    }

    pub async fn list_orders(&self, access: OrderAccess) -> Result<Vec<Order>, ServiceError> {
        let filter = match access {
            OrderAccess::Any => OrderFilter::default(),
            OrderAccess::OwnedBy(user) => OrderFilter::customer(user),
        };
        Ok(self.backends.orders.list(filter).await?)
    }

    /// Order, items and history. Orders outside `access` read as missing.
    pub async fn get_order_details(
        &self,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<OrderDetails, ServiceError> {
        let order = self.load(order_id, access).await?;
        let history = self.backends.audit.list_for_order(order_id).await?;
        Ok(OrderDetails { order, history })
    }

    /// Administrative edit of status, payment status, fulfillment and shipping fields.
    #[instrument(skip(self, update), fields(order_id = %order_id, requested = ?update.status), err)]
    pub async fn transition(
        &self,
        order_id: OrderId,
        update: &OrderUpdate,
        actor: Option<UserId>,
    ) -> Result<Order, ServiceError> {
        let order = self.load(order_id, OrderAccess::Any).await?;
        let plan = plan_update(&order, update, Utc::now())?;
        self.commit(plan, actor).await
    }

    /// Customer-facing cancellation (`pending`/`confirmed` only).
    #[instrument(skip(self, reason), fields(order_id = %order_id), err)]
    pub async fn cancel(
        &self,
        order_id: OrderId,
        access: OrderAccess,
        actor: Option<UserId>,
        reason: Option<&str>,
    ) -> Result<Order, ServiceError> {
        let order = self.load(order_id, access).await?;
        let plan = plan_cancellation(&order, reason, Utc::now())?;
        self.commit(plan, actor).await
    }

    async fn load(&self, order_id: OrderId, access: OrderAccess) -> Result<Order, ServiceError> {
        match self.backends.orders.get(order_id).await? {
            Some(order) if access.permits(&order) => Ok(order),
            _ => Err(ServiceError::NotFound),
        }
    }

    async fn commit(
        &self,
        plan: TransitionPlan,
        actor: Option<UserId>,
    ) -> Result<Order, ServiceError> {
        let movements = self.apply_inventory(&plan).await?;

        let expected = ExpectedVersion::Exact(plan.expected_version());
        let order = match self.backends.orders.update(plan.order.clone(), expected).await {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(
                    order_id = %plan.order.id,
                    error = %err,
                    "order write failed; reversing stock movements"
                );
                self.compensate(&movements).await;
                return Err(err.into());
            }
        };

        let now = Utc::now();
        for change in &plan.changes {
            let entry =
                StatusHistoryEntry::record(order.id, *change, plan.note.clone(), actor, now);
            if let Err(err) = self.backends.audit.append(entry).await {
                tracing::warn!(
                    order_id = %order.id,
                    change = change.kind(),
                    from = change.from_label(),
                    to = change.to_label(),
                    error = %err,
                    "failed to append status history"
                );
            }
        }

        if plan.status_changed() {
            tracing::info!(
                order_id = %order.id,
                order_number = %order.order_number,
                from = %plan.previous_status,
                to = %order.status,
                payment_status = %order.payment_status,
                effect = ?plan.effect,
                "order status changed"
            );
            self.spawn_notification(&order);
        }

        Ok(order)
    }

    /// Move stock for the plan. On a ledger failure, already-applied movements
    /// are reversed before the error is returned.
    async fn apply_inventory(
        &self,
        plan: &TransitionPlan,
    ) -> Result<Vec<StockMovement>, ServiceError> {
        let mut applied = Vec::new();

        for (key, quantity) in &plan.demand {
            let result = match plan.effect {
                InventoryEffect::None => continue,
                InventoryEffect::Deduct => self.backends.ledger.deduct(*key, *quantity).await,
                InventoryEffect::Restore => self.backends.ledger.restore(*key, *quantity).await,
            };

            match result {
                Ok(Some(movement)) => {
                    if movement.is_clamped() {
                        tracing::warn!(
                            order_id = %plan.order.id,
                            key = %key,
                            requested = movement.requested,
                            available = movement.previous,
                            "deduction exceeds stock; clamped at zero"
                        );
                    }
                    applied.push(movement);
                }
                Ok(None) => {
                    tracing::warn!(
                        order_id = %plan.order.id,
                        key = %key,
                        effect = ?plan.effect,
                        "no inventory row; item skipped"
                    );
                }
                Err(err) => {
                    tracing::error!(order_id = %plan.order.id, key = %key, error = %err, "inventory update failed");
                    self.compensate(&applied).await;
                    return Err(ServiceError::Internal(err.to_string()));
                }
            }
        }

        Ok(applied)
    }

    /// Reverse movements by the amounts that actually moved.
    async fn compensate(&self, movements: &[StockMovement]) {
        for m in movements.iter().rev() {
            let amount = m.applied();
            if amount == 0 {
                continue;
            }
            let result: Result<_, StoreError> = match m.kind {
                MovementKind::Deduct => self.backends.ledger.restore(m.key, amount).await,
                MovementKind::Restore => self.backends.ledger.deduct(m.key, amount).await,
            };
            if let Err(err) = result {
                tracing::error!(key = %m.key, amount, error = %err, "failed to reverse stock movement");
            }
        }
    }

    fn spawn_notification(&self, order: &Order) {
        let (kind, reason) = match order.status {
            OrderStatus::Cancelled => (
                NotificationKind::Cancelled,
                order.cancellation_reason.clone(),
            ),
            _ => (NotificationKind::StatusChanged, None),
        };
        let snapshot = OrderSnapshot::of(order, reason);
        let notifier = self.backends.notifier.clone();

        tokio::spawn(
            async move {
                if !notifier.notify(kind, &snapshot).await {
                    tracing::warn!(
                        kind = kind.as_str(),
                        order_number = %snapshot.order_number,
                        "customer notification failed"
                    );
                }
            }
            .in_current_span(),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::audit::InMemoryAuditTrail;
    use crate::notify::RecordingNotifier;
    use crate::testing::{ConflictingOrderStore, FailingAuditTrail, Fixture, seed};
    use storefront_inventory::StockKey;
    use storefront_core::ProductId;
    use storefront_orders::{FulfillmentStatus, ItemFulfillmentUpdate, PaymentStatus, StatusChange};

    fn to(status: OrderStatus) -> OrderUpdate {
        OrderUpdate {
            status: Some(status),
            ..OrderUpdate::default()
        }
    }

    #[tokio::test]
    async fn confirm_then_cancel_round_trips_stock_and_history() {
        let f = Fixture::new();
        let p = StockKey::product(ProductId::new());
        seed(&f.backends, p, 10, false).await;
        let order = f.place(&[(p, 5)]).await;

        let confirmed = f.engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(f.quantity(p).await, 5);
        assert_eq!(f.audit.list_for_order(order.id).await.unwrap().len(), 1);

        let cancelled = f
            .engine
            .cancel(order.id, OrderAccess::OwnedBy(order.customer_id), None, None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.payment_status, PaymentStatus::Voided);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("Cancelled at customer request")
        );
        assert_eq!(f.quantity(p).await, 10);

        let history = f.audit.list_for_order(order.id).await.unwrap();
        let changes: Vec<_> = history.iter().map(|e| e.change).collect();
        assert_eq!(
            changes,
            vec![
                StatusChange::Order { from: OrderStatus::Pending, to: OrderStatus::Confirmed },
                StatusChange::Order { from: OrderStatus::Confirmed, to: OrderStatus::Cancelled },
                StatusChange::Payment { from: PaymentStatus::Pending, to: PaymentStatus::Voided },
            ]
        );
    }

    #[tokio::test]
    async fn over_deduction_clamps_at_zero_and_succeeds() {
        let f = Fixture::new();
        let p = StockKey::product(ProductId::new());
        seed(&f.backends, p, 3, false).await;
        let order = f.place(&[(p, 5)]).await;

        let confirmed = f.engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(f.quantity(p).await, 0);
    }

    #[tokio::test]
    async fn repeating_a_status_deducts_once_and_records_nothing() {
        let f = Fixture::new();
        let p = StockKey::product(ProductId::new());
        seed(&f.backends, p, 10, false).await;
        let order = f.place(&[(p, 2)]).await;

        f.engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        f.engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        f.engine.transition(order.id, &to(OrderStatus::Processing), None).await.unwrap();

        assert_eq!(f.quantity(p).await, 8);
        assert_eq!(f.audit.list_for_order(order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn items_sharing_a_stock_row_are_summed() {
        let f = Fixture::new();
        let p = StockKey::product(ProductId::new());
        seed(&f.backends, p, 10, false).await;
        let order = f.place(&[(p, 2), (p, 3)]).await;

        f.engine.transition(order.id, &to(OrderStatus::Shipped), None).await.unwrap();
        assert_eq!(f.quantity(p).await, 5);
    }

    #[tokio::test]
    async fn cancelling_a_shipped_order_is_rejected_without_side_effects() {
        let f = Fixture::new();
        let p = StockKey::product(ProductId::new());
        seed(&f.backends, p, 10, false).await;
        let order = f.place(&[(p, 4)]).await;
        f.engine.transition(order.id, &to(OrderStatus::Shipped), None).await.unwrap();
        let history_before = f.audit.list_for_order(order.id).await.unwrap().len();

        let err = f
            .engine
            .cancel(order.id, OrderAccess::Any, None, Some("changed my mind"))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::InvalidTransition(_)));
        assert_eq!(f.quantity(p).await, 6);
        assert_eq!(f.audit.list_for_order(order.id).await.unwrap().len(), history_before);
        let stored = f.backends.orders.get(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn refunded_orders_cannot_move() {
        let f = Fixture::new();
        let order = f.place(&[(StockKey::product(ProductId::new()), 1)]).await;
        f.engine.transition(order.id, &to(OrderStatus::Refunded), None).await.unwrap();

        let err = f
            .engine
            .transition(order.id, &to(OrderStatus::Pending), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn missing_inventory_row_is_skipped() {
        let f = Fixture::new();
        let tracked = StockKey::product(ProductId::new());
        let unknown = StockKey::product(ProductId::new());
        seed(&f.backends, tracked, 4, false).await;
        let order = f.place(&[(tracked, 1), (unknown, 7)]).await;

        let confirmed = f.engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(f.quantity(tracked).await, 3);
        assert!(f.backends.ledger.get(unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn paid_orders_are_refunded_on_cancellation_with_reason() {
        let f = Fixture::new();
        let order = f.place(&[(StockKey::product(ProductId::new()), 1)]).await;
        let paid = OrderUpdate {
            payment_status: Some(PaymentStatus::Paid),
            note: Some("captured".to_string()),
            ..OrderUpdate::default()
        };
        f.engine.transition(order.id, &paid, None).await.unwrap();

        let actor = UserId::new();
        let cancelled = f
            .engine
            .cancel(order.id, OrderAccess::Any, Some(actor), Some("duplicate order"))
            .await
            .unwrap();
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

        let history = f.audit.list_for_order(order.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.note.as_deref(), Some("duplicate order"));
        assert_eq!(last.actor, Some(actor));
    }

    #[tokio::test]
    async fn non_owners_see_not_found() {
        let f = Fixture::new();
        let order = f.place(&[(StockKey::product(ProductId::new()), 1)]).await;
        let stranger = OrderAccess::OwnedBy(UserId::new());

        assert_eq!(
            f.engine.get_order_details(order.id, stranger).await.unwrap_err(),
            ServiceError::NotFound
        );
        assert_eq!(
            f.engine.cancel(order.id, stranger, None, None).await.unwrap_err(),
            ServiceError::NotFound
        );
        assert!(f.engine.list_orders(stranger).await.unwrap().is_empty());
        assert_eq!(f.engine.list_orders(OrderAccess::Any).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let f = Fixture::new();
        let err = f
            .engine
            .transition(OrderId::new(), &to(OrderStatus::Confirmed), None)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound);
    }

    #[tokio::test]
    async fn item_updates_drive_fulfillment_and_shipping_date() {
        let f = Fixture::new();
        let order = f
            .place(&[
                (StockKey::product(ProductId::new()), 1),
                (StockKey::product(ProductId::new()), 1),
            ])
            .await;
        let update = OrderUpdate {
            status: Some(OrderStatus::Shipped),
            tracking_number: Some("TRK-1".to_string()),
            items: vec![ItemFulfillmentUpdate {
                item_id: order.items[0].id,
                fulfillment_status: FulfillmentStatus::Fulfilled,
            }],
            ..OrderUpdate::default()
        };

        let shipped = f.engine.transition(order.id, &update, None).await.unwrap();
        assert_eq!(shipped.fulfillment_status, FulfillmentStatus::Partial);
        assert_eq!(shipped.tracking_number.as_deref(), Some("TRK-1"));
        assert!(shipped.shipping_date.is_some());
        assert_eq!(shipped.version, order.version + 1);
    }

    #[tokio::test]
    async fn write_conflict_reverses_stock_and_records_nothing() {
        let mut backends = Backends::in_memory();
        let store = Arc::new(ConflictingOrderStore::default());
        backends.orders = store.clone();
        let audit = Arc::new(InMemoryAuditTrail::new());
        backends.audit = audit.clone();
        let notifier = Arc::new(RecordingNotifier::new());
        backends.notifier = notifier.clone();
        let engine = TransitionEngine::new(backends.clone());

        let p = StockKey::product(ProductId::new());
        seed(&backends, p, 3, false).await;
        let order = engine
            .place_order(crate::testing::place_cmd(&[(p, 5)]))
            .await
            .unwrap();

        let err = engine
            .transition(order.id, &to(OrderStatus::Confirmed), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        // Clamped deduction moved 3, so exactly 3 comes back.
        assert_eq!(backends.ledger.get(p).await.unwrap().unwrap().quantity, 3);
        assert!(audit.all().is_empty());
        assert!(!notifier.wait_for(1, Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_transition() {
        let mut backends = Backends::in_memory();
        backends.audit = Arc::new(FailingAuditTrail);
        let engine = TransitionEngine::new(backends.clone());
        let p = StockKey::product(ProductId::new());
        seed(&backends, p, 10, false).await;
        let order = engine.place_order(crate::testing::place_cmd(&[(p, 1)])).await.unwrap();

        let confirmed = engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);
        assert_eq!(backends.ledger.get(p).await.unwrap().unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn notifications_fire_on_status_change_and_failures_are_swallowed() {
        let mut backends = Backends::in_memory();
        let notifier = Arc::new(RecordingNotifier::failing());
        backends.notifier = notifier.clone();
        let engine = TransitionEngine::new(backends);
        let order = engine
            .place_order(crate::testing::place_cmd(&[(StockKey::product(ProductId::new()), 1)]))
            .await
            .unwrap();

        engine.transition(order.id, &to(OrderStatus::Confirmed), None).await.unwrap();
        engine
            .cancel(order.id, OrderAccess::Any, None, Some("fraud check"))
            .await
            .unwrap();

        assert!(notifier.wait_for(2, Duration::from_secs(2)).await);
        let calls = notifier.calls();
        let changed = calls
            .iter()
            .find(|(kind, _)| *kind == NotificationKind::StatusChanged)
            .unwrap();
        assert_eq!(changed.1.status, OrderStatus::Confirmed);
        let cancelled = calls
            .iter()
            .find(|(kind, _)| *kind == NotificationKind::Cancelled)
            .unwrap();
        assert_eq!(cancelled.1.reason.as_deref(), Some("fraud check"));
    }
}
