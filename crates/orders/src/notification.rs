//! Customer notification payloads.
//!
//! The transport is external; this module only defines what is sent and how it
//! reads.

use core::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{ProductId, VariantId};

use crate::order::{Order, ShippingAddress, Totals};
use crate::status::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    StatusChanged,
    Cancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::StatusChanged => "status_changed",
            NotificationKind::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: u64,
}

/// Point-in-time copy of the order handed to the notification port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub ordered_at: DateTime<Utc>,
    pub items: Vec<SnapshotItem>,
    pub totals: Totals,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    pub tracking_number: Option<String>,
    pub status: OrderStatus,
    pub reason: Option<String>,
}

impl OrderSnapshot {
    pub fn of(order: &Order, reason: Option<String>) -> Self {
        Self {
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            ordered_at: order.created_at,
            items: order
                .items
                .iter()
                .map(|i| SnapshotItem {
                    product_id: i.product_id,
                    variant_id: i.variant_id,
                    product_name: i.product_name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
            totals: order.totals,
            currency: order.currency.clone(),
            shipping_address: order.shipping_address.clone(),
            tracking_number: order.tracking_number.clone(),
            status: order.status,
            reason,
        }
    }
}

/// Rendered, transport-agnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl NotificationMessage {
    pub fn render(kind: NotificationKind, snapshot: &OrderSnapshot) -> Self {
        let subject = match kind {
            NotificationKind::StatusChanged => format!(
                "Order {} is now {}",
                snapshot.order_number, snapshot.status
            ),
            NotificationKind::Cancelled => {
                format!("Order {} has been cancelled", snapshot.order_number)
            }
        };

        let cur = snapshot.currency.as_str();
        let mut body = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(body, "Hi {},", snapshot.customer_name);
        let _ = writeln!(body);
        match kind {
            NotificationKind::StatusChanged => {
                let _ = writeln!(
                    body,
                    "Your order {} placed on {} is now {}.",
                    snapshot.order_number,
                    snapshot.ordered_at.format("%Y-%m-%d"),
                    snapshot.status
                );
            }
            NotificationKind::Cancelled => {
                let _ = writeln!(
                    body,
                    "Your order {} placed on {} has been cancelled.",
                    snapshot.order_number,
                    snapshot.ordered_at.format("%Y-%m-%d"),
                );
            }
        }
        if let Some(reason) = &snapshot.reason {
            let _ = writeln!(body, "Reason: {reason}");
        }
        if let Some(tracking) = &snapshot.tracking_number {
            let _ = writeln!(body, "Tracking number: {tracking}");
        }

        let _ = writeln!(body);
        let _ = writeln!(body, "Items:");
        for item in &snapshot.items {
            let _ = writeln!(
                body,
                "  {} x {} @ {}",
                item.quantity,
                item.product_name,
                money(item.unit_price, cur)
            );
        }

        let t = &snapshot.totals;
        let _ = writeln!(body);
        let _ = writeln!(body, "Subtotal: {}", money(t.subtotal, cur));
        let _ = writeln!(body, "Tax: {}", money(t.tax, cur));
        let _ = writeln!(body, "Shipping: {}", money(t.shipping, cur));
        if t.discount > 0 {
            let _ = writeln!(body, "Discount: -{}", money(t.discount, cur));
        }
        let _ = writeln!(body, "Total: {}", money(t.total, cur));

        let a = &snapshot.shipping_address;
        let _ = writeln!(body);
        let _ = writeln!(body, "Shipping to:");
        let _ = writeln!(body, "  {}", a.name);
        let _ = writeln!(body, "  {}", a.line1);
        if let Some(line2) = &a.line2 {
            let _ = writeln!(body, "  {line2}");
        }
        match &a.region {
            Some(region) => {
                let _ = writeln!(body, "  {} {} {}", a.postal_code, a.city, region);
            }
            None => {
                let _ = writeln!(body, "  {} {}", a.postal_code, a.city);
            }
        }
        let _ = writeln!(body, "  {}", a.country);

        Self {
            to: snapshot.customer_email.clone(),
            subject,
            body,
        }
    }
}

/// Minor units as a two-decimal amount, e.g. `1234` → `12.34 USD`.
fn money(amount: u64, currency: &str) -> String {
    format!("{}.{:02} {}", amount / 100, amount % 100, currency)
}
