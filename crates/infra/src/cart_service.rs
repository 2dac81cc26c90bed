//! Cart-time stock guard and cart reads.
//!
//! Uses the same ledger rows as the transition engine, read-only.

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use storefront_cart::{AddToCart, CartAcceptance, CartLine, check_cart_addition};
use storefront_inventory::StockStatus;

use crate::backends::Backends;
use crate::carts::CartStore;
use crate::error::ServiceError;
use crate::ledger::InventoryLedger;

/// Result of an accepted addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartAddition {
    pub line: CartLine,
    pub acceptance: CartAcceptance,
}

/// A cart line joined with the current stock snapshot (absent for untracked products).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartViewLine {
    #[serde(flatten)]
    pub line: CartLine,
    pub stock_quantity: Option<i64>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart_key: String,
    pub lines: Vec<CartViewLine>,
}

pub struct CartService {
    backends: Backends,
}

impl CartService {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Check stock for `cmd.quantity` on top of what the cart already holds for
    /// the same product and variant, then merge the line.
    #[instrument(skip(self, cmd), fields(product_id = %cmd.product_id, quantity = cmd.quantity), err)]
    pub async fn add_item(&self, cmd: AddToCart) -> Result<CartAddition, ServiceError> {
        cmd.validate()?;
        let key = cmd.stock_key();
        let cart_key = cmd.cart_key.trim();

        let already_in_cart: i64 = self
            .backends
            .carts
            .lines_for(cart_key)
            .await?
            .iter()
            .filter(|l| l.stock_key() == key)
            .map(|l| l.quantity)
            .sum();

        let availability = self
            .backends
            .ledger
            .check_availability(key, already_in_cart.saturating_add(cmd.quantity))
            .await?;

        let acceptance = check_cart_addition(availability.as_ref(), already_in_cart, cmd.quantity)
            .inspect_err(|rejection| {
                tracing::info!(key = %key, code = rejection.code(), "cart addition rejected");
            })?;

        let line = self.backends.carts.merge_line(CartLine::new(&cmd)).await?;
        Ok(CartAddition { line, acceptance })
    }

    pub async fn get_cart(&self, cart_key: &str) -> Result<CartView, ServiceError> {
        let cart_key = cart_key.trim();
        if cart_key.is_empty() {
            return Err(ServiceError::Validation("cart_key cannot be empty".to_string()));
        }

        let lines = self.backends.carts.lines_for(cart_key).await?;
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let record = self.backends.ledger.get(line.stock_key()).await?;
            let (stock_quantity, stock_status) = match record {
                Some(r) if r.track_inventory => (Some(r.quantity), Some(r.classify())),
                _ => (None, None),
            };
            out.push(CartViewLine {
                line,
                stock_quantity,
                stock_status,
            });
        }

        Ok(CartView {
            cart_key: cart_key.to_string(),
            lines: out,
        })
    }
}

/// Command constructor for callers that do not carry their own clock.
pub fn add_to_cart_now(
    cart_key: impl Into<String>,
    product_id: storefront_core::ProductId,
    variant_id: Option<storefront_core::VariantId>,
    quantity: i64,
) -> AddToCart {
    AddToCart {
        cart_key: cart_key.into(),
        product_id,
        variant_id,
        quantity,
        occurred_at: Utc::now(),
    }
}
