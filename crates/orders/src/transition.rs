//! Order status state machine.
//!
//! Planning is pure: given the loaded order and a requested change, compute the
//! next order state, the audit changes, and which inventory movement (if any)
//! the change crosses. Inventory effects are keyed off the *previous* status:
//!
//! 1. entering `confirmed`/`processing` from outside that pair deducts;
//! 2. entering `shipped`/`delivered` from outside that pair *and* outside
//!    `confirmed`/`processing` deducts (the confirm step was skipped);
//! 3. entering `cancelled`/`refunded` from outside that pair, from a status
//!    that holds stock, restores.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, OrderItemId};
use storefront_inventory::StockKey;

use crate::history::StatusChange;
use crate::order::{Order, OrderItem};
use crate::status::{FulfillmentStatus, OrderStatus, PaymentStatus};

pub const DEFAULT_CANCELLATION_REASON: &str = "Cancelled at customer request";

/// Inventory movement a status change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryEffect {
    None,
    Deduct,
    Restore,
}

pub fn inventory_effect(previous: OrderStatus, next: OrderStatus) -> InventoryEffect {
    use OrderStatus::*;

    let reserving = |s: OrderStatus| matches!(s, Confirmed | Processing);
    let fulfilling = |s: OrderStatus| matches!(s, Shipped | Delivered);
    let reversing = |s: OrderStatus| matches!(s, Cancelled | Refunded);

    if reserving(next) && !reserving(previous) {
        InventoryEffect::Deduct
    } else if fulfilling(next) && !fulfilling(previous) && !reserving(previous) {
        InventoryEffect::Deduct
    } else if reversing(next) && !reversing(previous) && previous.holds_stock() {
        InventoryEffect::Restore
    } else {
        InventoryEffect::None
    }
}

/// Legality of an administrative status edit.
///
/// Re-entering the current status is always allowed. Non-terminal orders may be
/// moved to any status (corrections included). `delivered` and `cancelled` may
/// only move on to `refunded`; `refunded` is final.
pub fn validate_status_edit(from: OrderStatus, to: OrderStatus) -> DomainResult<()> {
    use OrderStatus::*;

    if from == to {
        return Ok(());
    }
    let allowed = match from {
        Pending | Confirmed | Processing | Shipped => true,
        Delivered | Cancelled => to == Refunded,
        Refunded => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::invalid_transition(format!(
            "cannot move order from {from} to {to}"
        )))
    }
}

/// Customer-facing cancellation guard.
pub fn ensure_cancellable(status: OrderStatus) -> DomainResult<()> {
    match status {
        OrderStatus::Pending | OrderStatus::Confirmed => Ok(()),
        other => Err(DomainError::invalid_transition(format!(
            "order in status {other} can no longer be cancelled"
        ))),
    }
}

/// Quantity per stock row, summed across items sharing a (product, variant).
pub fn stock_demand(items: &[OrderItem]) -> Vec<(StockKey, i64)> {
    let mut demand: BTreeMap<StockKey, i64> = BTreeMap::new();
    for item in items {
        *demand.entry(item.stock_key()).or_default() += item.quantity;
    }
    demand.into_iter().collect()
}

/// Fulfillment change for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFulfillmentUpdate {
    pub item_id: OrderItemId,
    pub fulfillment_status: FulfillmentStatus,
}

/// Partial administrative update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Explicit override; otherwise derived from the items.
    pub fulfillment_status: Option<FulfillmentStatus>,
    /// An empty string clears the tracking number.
    pub tracking_number: Option<String>,
    pub shipping_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemFulfillmentUpdate>,
}

/// Everything the infrastructure layer needs to commit a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Next order state. `version` is still the loaded version (the expected one).
    pub order: Order,
    pub previous_status: OrderStatus,
    pub effect: InventoryEffect,
    /// Empty unless `effect` is a deduct or restore.
    pub demand: Vec<(StockKey, i64)>,
    pub changes: Vec<StatusChange>,
    pub note: Option<String>,
}

impl TransitionPlan {
    pub fn status_changed(&self) -> bool {
        self.previous_status != self.order.status
    }

    pub fn expected_version(&self) -> u64 {
        self.order.version
    }
}

pub fn plan_update(
    order: &Order,
    update: &OrderUpdate,
    now: DateTime<Utc>,
) -> DomainResult<TransitionPlan> {
    let mut next = order.clone();

    if let Some(status) = update.status {
        validate_status_edit(order.status, status)?;
        next.status = status;
    }
    if let Some(payment) = update.payment_status {
        next.payment_status = payment;
    }

    for change in &update.items {
        let item = next
            .items
            .iter_mut()
            .find(|i| i.id == change.item_id)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "item {} does not belong to order {}",
                    change.item_id, order.id
                ))
            })?;
        item.fulfillment_status = change.fulfillment_status;
    }

    next.fulfillment_status = update
        .fulfillment_status
        .unwrap_or_else(|| next.derived_fulfillment());

    if let Some(tracking) = &update.tracking_number {
        let tracking = tracking.trim();
        next.tracking_number = (!tracking.is_empty()).then(|| tracking.to_string());
    }
    if let Some(at) = update.shipping_date {
        next.shipping_date = Some(at);
    }
    if let Some(at) = update.delivery_date {
        next.delivery_date = Some(at);
    }
    stamp_fulfillment_dates(order.status, &mut next, now);
    next.updated_at = now;

    Ok(finish(order, next, update.note.clone()))
}

pub fn plan_cancellation(
    order: &Order,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> DomainResult<TransitionPlan> {
    ensure_cancellable(order.status)?;

    let reason = reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_CANCELLATION_REASON)
        .to_string();

    let mut next = order.clone();
    next.status = OrderStatus::Cancelled;
    next.payment_status = match order.payment_status {
        PaymentStatus::Paid => PaymentStatus::Refunded,
        _ => PaymentStatus::Voided,
    };
    next.cancellation_reason = Some(reason.clone());
    next.fulfillment_status = next.derived_fulfillment();
    next.updated_at = now;

    Ok(finish(order, next, Some(reason)))
}

fn stamp_fulfillment_dates(previous: OrderStatus, next: &mut Order, now: DateTime<Utc>) {
    if next.status == previous {
        return;
    }
    match next.status {
        OrderStatus::Shipped if next.shipping_date.is_none() => next.shipping_date = Some(now),
        OrderStatus::Delivered if next.delivery_date.is_none() => next.delivery_date = Some(now),
        _ => {}
    }
}

fn finish(order: &Order, next: Order, note: Option<String>) -> TransitionPlan {
    let mut changes = Vec::new();
    if next.status != order.status {
        changes.push(StatusChange::Order {
            from: order.status,
            to: next.status,
        });
    }
    if next.payment_status != order.payment_status {
        changes.push(StatusChange::Payment {
            from: order.payment_status,
            to: next.payment_status,
        });
    }

    let effect = inventory_effect(order.status, next.status);
    let demand = match effect {
        InventoryEffect::None => Vec::new(),
        _ => stock_demand(&order.items),
    };

    TransitionPlan {
        previous_status: order.status,
        order: next,
        effect,
        demand,
        changes,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::{line, place_cmd};
    use storefront_core::{ProductId, VariantId};
    use OrderStatus::*;

    fn placed(items: usize) -> Order {
        let lines = (0..items).map(|_| line(ProductId::new(), 5, 100)).collect();
        Order::place(place_cmd(lines)).unwrap()
    }

    fn with_status(mut order: Order, status: OrderStatus) -> Order {
        order.status = status;
        order
    }

    fn set_status(status: OrderStatus) -> OrderUpdate {
        OrderUpdate {
            status: Some(status),
            ..OrderUpdate::default()
        }
    }

    #[test]
    fn entering_confirmed_or_processing_deducts_once() {
        assert_eq!(inventory_effect(Pending, Confirmed), InventoryEffect::Deduct);
        assert_eq!(inventory_effect(Pending, Processing), InventoryEffect::Deduct);
        assert_eq!(inventory_effect(Confirmed, Processing), InventoryEffect::None);
        assert_eq!(inventory_effect(Confirmed, Confirmed), InventoryEffect::None);
    }

    #[test]
    fn skipping_straight_to_fulfillment_deducts() {
        assert_eq!(inventory_effect(Pending, Shipped), InventoryEffect::Deduct);
        assert_eq!(inventory_effect(Pending, Delivered), InventoryEffect::Deduct);
        assert_eq!(inventory_effect(Processing, Shipped), InventoryEffect::None);
        assert_eq!(inventory_effect(Shipped, Delivered), InventoryEffect::None);
    }

    #[test]
    fn reversal_restores_only_if_stock_was_held() {
        assert_eq!(inventory_effect(Confirmed, Cancelled), InventoryEffect::Restore);
        assert_eq!(inventory_effect(Delivered, Refunded), InventoryEffect::Restore);
        assert_eq!(inventory_effect(Pending, Cancelled), InventoryEffect::None);
        assert_eq!(inventory_effect(Cancelled, Refunded), InventoryEffect::None);
    }

    #[test]
    fn revisiting_confirmed_after_shipping_deducts_again() {
        // Literal previous-status rule: shipped is not in {confirmed, processing}.
        assert_eq!(inventory_effect(Shipped, Confirmed), InventoryEffect::Deduct);
    }

    #[test]
    fn terminal_statuses_only_move_to_refunded() {
        assert!(validate_status_edit(Delivered, Refunded).is_ok());
        assert!(validate_status_edit(Cancelled, Refunded).is_ok());
        assert!(matches!(
            validate_status_edit(Delivered, Shipped),
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(validate_status_edit(Refunded, Pending).is_err());
        assert!(validate_status_edit(Refunded, Refunded).is_ok());
        assert!(validate_status_edit(Shipped, Confirmed).is_ok());
    }

    #[test]
    fn update_records_status_and_payment_changes_separately() {
        let order = placed(1);
        let update = OrderUpdate {
            status: Some(Confirmed),
            payment_status: Some(PaymentStatus::Paid),
            note: Some("payment captured".to_string()),
            ..OrderUpdate::default()
        };
        let plan = plan_update(&order, &update, Utc::now()).unwrap();

        assert_eq!(plan.effect, InventoryEffect::Deduct);
        assert_eq!(plan.demand.len(), 1);
        assert_eq!(
            plan.changes,
            vec![
                StatusChange::Order { from: Pending, to: Confirmed },
                StatusChange::Payment {
                    from: PaymentStatus::Pending,
                    to: PaymentStatus::Paid
                },
            ]
        );
        assert_eq!(plan.expected_version(), order.version);
    }

    #[test]
    fn same_status_twice_has_no_effect_and_no_history() {
        let order = with_status(placed(1), Confirmed);
        let plan = plan_update(&order, &set_status(Confirmed), Utc::now()).unwrap();
        assert_eq!(plan.effect, InventoryEffect::None);
        assert!(plan.demand.is_empty());
        assert!(plan.changes.is_empty());
        assert!(!plan.status_changed());
    }

    #[test]
    fn demand_is_summed_per_product_and_variant() {
        let product = ProductId::new();
        let variant = VariantId::new();
        let mut a = line(product, 2, 100);
        let mut b = line(product, 3, 100);
        let c = line(product, 4, 100);
        a.variant_id = Some(variant);
        b.variant_id = Some(variant);
        let order = Order::place(place_cmd(vec![a, b, c])).unwrap();

        let demand = stock_demand(&order.items);
        assert_eq!(demand.len(), 2);
        assert!(demand.contains(&(StockKey::new(product, Some(variant)), 5)));
        assert!(demand.contains(&(StockKey::product(product), 4)));
    }

    #[test]
    fn item_fulfillment_updates_drive_derived_status() {
        let order = placed(3);
        let update = OrderUpdate {
            items: vec![
                ItemFulfillmentUpdate {
                    item_id: order.items[0].id,
                    fulfillment_status: FulfillmentStatus::Fulfilled,
                },
                ItemFulfillmentUpdate {
                    item_id: order.items[1].id,
                    fulfillment_status: FulfillmentStatus::Fulfilled,
                },
            ],
            ..OrderUpdate::default()
        };
        let plan = plan_update(&order, &update, Utc::now()).unwrap();
        assert_eq!(plan.order.fulfillment_status, FulfillmentStatus::Partial);

        let explicit = OrderUpdate {
            fulfillment_status: Some(FulfillmentStatus::Fulfilled),
            ..OrderUpdate::default()
        };
        let plan = plan_update(&order, &explicit, Utc::now()).unwrap();
        assert_eq!(plan.order.fulfillment_status, FulfillmentStatus::Fulfilled);
    }

    #[test]
    fn foreign_item_ids_are_rejected() {
        let order = placed(1);
        let update = OrderUpdate {
            items: vec![ItemFulfillmentUpdate {
                item_id: OrderItemId::new(),
                fulfillment_status: FulfillmentStatus::Fulfilled,
            }],
            ..OrderUpdate::default()
        };
        assert!(matches!(
            plan_update(&order, &update, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn shipping_stamps_date_and_tracking_can_be_cleared() {
        let now = Utc::now();
        let mut order = with_status(placed(1), Processing);
        order.tracking_number = Some("1Z999".to_string());

        let update = OrderUpdate {
            status: Some(Shipped),
            tracking_number: Some("  ".to_string()),
            ..OrderUpdate::default()
        };
        let plan = plan_update(&order, &update, now).unwrap();
        assert_eq!(plan.order.shipping_date, Some(now));
        assert_eq!(plan.order.tracking_number, None);
        assert_eq!(plan.effect, InventoryEffect::None);
    }

    #[test]
    fn cancellation_voids_unpaid_and_refunds_paid() {
        let order = with_status(placed(1), Confirmed);
        let plan = plan_cancellation(&order, None, Utc::now()).unwrap();
        assert_eq!(plan.order.status, Cancelled);
        assert_eq!(plan.order.payment_status, PaymentStatus::Voided);
        assert_eq!(
            plan.order.cancellation_reason.as_deref(),
            Some(DEFAULT_CANCELLATION_REASON)
        );
        assert_eq!(plan.effect, InventoryEffect::Restore);
        assert_eq!(plan.changes.len(), 2);

        let mut paid = placed(1);
        paid.payment_status = PaymentStatus::Paid;
        let plan = plan_cancellation(&paid, Some("changed my mind"), Utc::now()).unwrap();
        assert_eq!(plan.order.payment_status, PaymentStatus::Refunded);
        assert_eq!(plan.note.as_deref(), Some("changed my mind"));
        assert_eq!(plan.effect, InventoryEffect::None);
    }

    #[test]
    fn cancellation_is_refused_once_fulfillment_started() {
        for status in [Processing, Shipped, Delivered, Cancelled, Refunded] {
            let order = with_status(placed(1), status);
            assert!(matches!(
                plan_cancellation(&order, None, Utc::now()),
                Err(DomainError::InvalidTransition(_))
            ));
        }
    }
}
