use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CartLineId, DomainError, DomainResult, ProductId, VariantId};
use storefront_inventory::StockKey;

const MAX_CART_KEY_LEN: usize = 128;

/// Command: AddToCart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    pub cart_key: String,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

impl AddToCart {
    pub fn validate(&self) -> DomainResult<()> {
        let key = self.cart_key.trim();
        if key.is_empty() {
            return Err(DomainError::validation("cart_key cannot be empty"));
        }
        if key.len() > MAX_CART_KEY_LEN {
            return Err(DomainError::validation("cart_key is too long"));
        }
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id)
    }
}

/// One (product, variant) line in a cart. Repeated additions merge into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_key: String,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    pub fn new(cmd: &AddToCart) -> Self {
        Self {
            id: CartLineId::new(),
            cart_key: cmd.cart_key.trim().to_string(),
            product_id: cmd.product_id,
            variant_id: cmd.variant_id,
            quantity: cmd.quantity,
            added_at: cmd.occurred_at,
            updated_at: cmd.occurred_at,
        }
    }

    pub fn stock_key(&self) -> StockKey {
        StockKey::new(self.product_id, self.variant_id)
    }

    pub fn merge(&mut self, quantity: i64, at: DateTime<Utc>) {
        self.quantity = self.quantity.saturating_add(quantity);
        self.updated_at = at;
    }
}
