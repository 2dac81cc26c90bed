use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, OrderId, OrderItemId, ProductId, UserId, VariantId};
use storefront_inventory::StockKey;

use crate::status::{FulfillmentStatus, OrderStatus, PaymentStatus, derive_fulfillment};

/// Structured shipping address captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping_address.{field} cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Monetary totals in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: u64,
    pub tax: u64,
    pub shipping: u64,
    pub discount: u64,
    pub total: u64,
}

impl Totals {
    pub fn compute(subtotal: u64, tax: u64, shipping: u64, discount: u64) -> DomainResult<Self> {
        let gross = subtotal
            .checked_add(tax)
            .and_then(|v| v.checked_add(shipping))
            .ok_or_else(|| DomainError::validation("order total overflows"))?;

        Ok(Self {
            subtotal,
            tax,
            shipping,
            discount,
            total: gross.saturating_sub(discount),
        })
    }
}

/// One purchased line. Immutable after placement except `fulfillment_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Catalog name at the time of purchase.
    pub product_name: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub fulfillment_status: FulfillmentStatus,
}

impl OrderItem {
    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id)
    }

    pub fn line_total(&self) -> u64 {
        (self.quantity.max(0) as u64).saturating_mul(self.unit_price)
    }
}

/// A placed order together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub currency: String,
    pub totals: Totals,
    pub shipping_address: ShippingAddress,
    pub tracking_number: Option<String>,
    pub shipping_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented by the store on every successful write.
    pub version: u64,
}

/// Input line for placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: u64,
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub customer_id: UserId,
    pub customer_name: String,
    pub customer_email: String,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<NewOrderItem>,
    pub tax: u64,
    pub shipping: u64,
    pub discount: u64,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Validate a checkout and build the `pending` order it describes.
    ///
    /// Placing an order has no inventory effect; stock moves on confirmation.
    pub fn place(cmd: PlaceOrder) -> DomainResult<Self> {
        if cmd.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if cmd.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer_name cannot be empty"));
        }
        if !cmd.customer_email.contains('@') {
            return Err(DomainError::validation("customer_email is not a valid address"));
        }
        let currency = normalize_currency(&cmd.currency)?;
        cmd.shipping_address.validate()?;

        let mut items = Vec::with_capacity(cmd.items.len());
        let mut subtotal: u64 = 0;
        for line in cmd.items {
            if line.quantity <= 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            if line.product_name.trim().is_empty() {
                return Err(DomainError::validation("product_name cannot be empty"));
            }
            let line_total = (line.quantity as u64)
                .checked_mul(line.unit_price)
                .ok_or_else(|| DomainError::validation("line total overflows"))?;
            subtotal = subtotal
                .checked_add(line_total)
                .ok_or_else(|| DomainError::validation("order subtotal overflows"))?;

            items.push(OrderItem {
                id: OrderItemId::new(),
                order_id: cmd.order_id,
                product_id: line.product_id,
                variant_id: line.variant_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
                fulfillment_status: FulfillmentStatus::Unfulfilled,
            });
        }

        let totals = Totals::compute(subtotal, cmd.tax, cmd.shipping, cmd.discount)?;

        Ok(Self {
            id: cmd.order_id,
            order_number: order_number(cmd.order_id, cmd.placed_at),
            customer_id: cmd.customer_id,
            customer_name: cmd.customer_name,
            customer_email: cmd.customer_email,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            currency,
            totals,
            shipping_address: cmd.shipping_address,
            tracking_number: None,
            shipping_date: None,
            delivery_date: None,
            cancellation_reason: None,
            items,
            created_at: cmd.placed_at,
            updated_at: cmd.placed_at,
            version: 0,
        })
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.customer_id == user
    }

    /// Fulfillment status derived from the current item statuses.
    pub fn derived_fulfillment(&self) -> FulfillmentStatus {
        derive_fulfillment(self.items.iter().map(|i| i.fulfillment_status))
    }
}

/// Human-readable order number: `ORD-<placement date>-<8 hex chars of the id>`.
pub fn order_number(id: OrderId, placed_at: DateTime<Utc>) -> String {
    let hex = id.as_uuid().simple().to_string();
    let suffix = &hex[hex.len() - 8..];
    format!("ORD-{}-{}", placed_at.format("%Y%m%d"), suffix.to_uppercase())
}

fn normalize_currency(code: &str) -> DomainResult<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation(
            "currency must be a 3-letter ISO 4217 code",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn test_address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".to_string(),
            line1: "12 Analytical Row".to_string(),
            line2: None,
            city: "London".to_string(),
            region: None,
            postal_code: "N1 9GU".to_string(),
            country: "GB".to_string(),
        }
    }

    pub(crate) fn place_cmd(items: Vec<NewOrderItem>) -> PlaceOrder {
        PlaceOrder {
            order_id: OrderId::new(),
            customer_id: UserId::new(),
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            currency: "gbp".to_string(),
            shipping_address: test_address(),
            items,
            tax: 200,
            shipping: 500,
            discount: 100,
            placed_at: Utc::now(),
        }
    }

    pub(crate) fn line(product_id: ProductId, quantity: i64, unit_price: u64) -> NewOrderItem {
        NewOrderItem {
            product_id,
            variant_id: None,
            product_name: "Widget".to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn place_order_computes_totals_and_starts_pending() {
        let order = Order::place(place_cmd(vec![
            line(ProductId::new(), 2, 1_000),
            line(ProductId::new(), 1, 250),
        ]))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Unfulfilled);
        assert_eq!(order.currency, "GBP");
        assert_eq!(order.totals.subtotal, 2_250);
        assert_eq!(order.totals.total, 2_250 + 200 + 500 - 100);
        assert_eq!(order.items.len(), 2);
        assert!(order.items.iter().all(|i| i.order_id == order.id));
        assert_eq!(order.version, 0);
    }

    #[test]
    fn place_order_rejects_bad_input() {
        let err = Order::place(place_cmd(vec![])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Order::place(place_cmd(vec![line(ProductId::new(), 0, 100)])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("quantity")));

        let mut cmd = place_cmd(vec![line(ProductId::new(), 1, 100)]);
        cmd.currency = "EURO".to_string();
        assert!(Order::place(cmd).is_err());

        let mut cmd = place_cmd(vec![line(ProductId::new(), 1, 100)]);
        cmd.shipping_address.city = "  ".to_string();
        assert!(Order::place(cmd).is_err());
    }

    #[test]
    fn discount_larger_than_gross_floors_total_at_zero() {
        let totals = Totals::compute(100, 0, 0, 500).unwrap();
        assert_eq!(totals.total, 0);
    }

    #[test]
    fn order_number_uses_placement_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let number = order_number(OrderId::new(), at);
        assert!(number.starts_with("ORD-20260309-"));
        assert_eq!(number.len(), "ORD-20260309-".len() + 8);
    }
}
