use std::sync::Mutex;

use storefront_cart::CartLine;

use super::r#trait::CartStore;
use crate::error::StoreError;

/// In-memory cart store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    lines: Mutex<Vec<CartLine>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CartStore for InMemoryCartStore {
    async fn lines_for(&self, cart_key: &str) -> Result<Vec<CartLine>, StoreError> {
        let lines = self
            .lines
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(lines
            .iter()
            .filter(|l| l.cart_key == cart_key)
            .cloned()
            .collect())
    }

    async fn merge_line(&self, line: CartLine) -> Result<CartLine, StoreError> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        let existing = lines.iter_mut().find(|l| {
            l.cart_key == line.cart_key
                && l.product_id == line.product_id
                && l.variant_id == line.variant_id
        });
        match existing {
            Some(l) => {
                l.merge(line.quantity, line.updated_at);
                Ok(l.clone())
            }
            None => {
                lines.push(line.clone());
                Ok(line)
            }
        }
    }
}
