use core::str::FromStr;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use storefront_core::{DomainError, OrderId, ProductId, UserId, VariantId};
use storefront_inventory::{InventoryRecord, StockKey};
use storefront_orders::{
    FulfillmentStatus, ItemFulfillmentUpdate, NewOrderItem, OrderStatus, OrderUpdate,
    PaymentStatus, PlaceOrder, ShippingAddress,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub currency: String,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub tax: u64,
    #[serde(default)]
    pub shipping: u64,
    #[serde(default)]
    pub discount: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub variant_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: u64,
}

impl PlaceOrderRequest {
    /// The caller becomes the customer of the new order.
    pub fn into_command(self, customer_id: UserId) -> Result<PlaceOrder, axum::response::Response> {
        let items = self
            .items
            .into_iter()
            .map(|i| {
                Ok(NewOrderItem {
                    product_id: parse_id(&i.product_id, "product id")?,
                    variant_id: parse_optional_id(i.variant_id.as_deref(), "variant id")?,
                    product_name: i.product_name,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
            })
            .collect::<Result<Vec<_>, axum::response::Response>>()?;

        Ok(PlaceOrder {
            order_id: OrderId::new(),
            customer_id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            currency: self.currency,
            shipping_address: self.shipping_address,
            items,
            tax: self.tax,
            shipping: self.shipping,
            discount: self.discount,
            placed_at: Utc::now(),
        })
    }
}

/// Administrative edit. Status fields arrive as strings and are parsed here so
/// unknown values surface as `400 validation_error`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_date: Option<DateTime<Utc>>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemFulfillmentRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ItemFulfillmentRequest {
    pub item_id: String,
    pub fulfillment_status: String,
}

impl UpdateOrderRequest {
    pub fn into_update(self) -> Result<OrderUpdate, axum::response::Response> {
        let items = self
            .items
            .into_iter()
            .map(|i| {
                Ok(ItemFulfillmentUpdate {
                    item_id: parse_id(&i.item_id, "item id")?,
                    fulfillment_status: parse_status::<FulfillmentStatus>(&i.fulfillment_status)?,
                })
            })
            .collect::<Result<Vec<_>, axum::response::Response>>()?;

        Ok(OrderUpdate {
            status: self.status.as_deref().map(parse_status::<OrderStatus>).transpose()?,
            payment_status: self
                .payment_status
                .as_deref()
                .map(parse_status::<PaymentStatus>)
                .transpose()?,
            fulfillment_status: self
                .fulfillment_status
                .as_deref()
                .map(parse_status::<FulfillmentStatus>)
                .transpose()?,
            tracking_number: self.tracking_number,
            shipping_date: self.shipping_date,
            delivery_date: self.delivery_date,
            note: self.note,
            items,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertInventoryRequest {
    pub quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    #[serde(default)]
    pub allow_backorder: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct VariantQuery {
    pub variant_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CartQuery {
    pub cart_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub cart_key: String,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub quantity: i64,
}

// -------------------------
// Parsing helpers
// -------------------------

/// Parse a UUID path/body value into a typed id (`400 invalid_id` on failure).
pub fn parse_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, axum::response::Response> {
    raw.trim()
        .parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what}")))
}

pub fn parse_optional_id<T: FromStr>(
    raw: Option<&str>,
    what: &'static str,
) -> Result<Option<T>, axum::response::Response> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_id(s, what).map(Some),
        None => Ok(None),
    }
}

pub fn parse_stock_key(
    product_id: &str,
    variant_id: Option<&str>,
) -> Result<StockKey, axum::response::Response> {
    let product_id: ProductId = parse_id(product_id, "product id")?;
    let variant_id: Option<VariantId> = parse_optional_id(variant_id, "variant id")?;
    Ok(StockKey::new(product_id, variant_id))
}

fn parse_status<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))
}

// -------------------------
// Response mapping
// -------------------------

pub fn inventory_to_json(record: InventoryRecord) -> serde_json::Value {
    serde_json::json!({
        "product_id": record.key.product_id.to_string(),
        "variant_id": record.key.variant_id.map(|v| v.to_string()),
        "quantity": record.quantity,
        "low_stock_threshold": record.low_stock_threshold,
        "track_inventory": record.track_inventory,
        "allow_backorder": record.allow_backorder,
        "stock_status": record.classify().as_str(),
        "updated_at": record.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_a_bad_request() {
        let req = UpdateOrderRequest {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        let resp = req.into_update().unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn known_statuses_parse() {
        let req = UpdateOrderRequest {
            status: Some("confirmed".to_string()),
            payment_status: Some("paid".to_string()),
            ..Default::default()
        };
        let Ok(update) = req.into_update() else {
            panic!("confirmed/paid should parse");
        };
        assert_eq!(update.status, Some(OrderStatus::Confirmed));
        assert_eq!(update.payment_status, Some(PaymentStatus::Paid));
        assert!(update.items.is_empty());
    }

    #[test]
    fn blank_variant_means_product_level_row() {
        let product = ProductId::new();
        let Ok(key) = parse_stock_key(&product.to_string(), Some("  ")) else {
            panic!("product id should parse");
        };
        assert_eq!(key, StockKey::product(product));
        assert!(parse_stock_key("not-a-uuid", None).is_err());
    }
}
