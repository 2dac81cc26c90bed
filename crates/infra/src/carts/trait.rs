use std::sync::Arc;

use storefront_cart::CartLine;

use crate::error::StoreError;

/// Cart store port. One line per `(cart_key, product, variant)`.
#[async_trait::async_trait]
pub trait CartStore: Send + Sync {
    /// Lines of a cart, oldest first. Unknown keys yield an empty cart.
    async fn lines_for(&self, cart_key: &str) -> Result<Vec<CartLine>, StoreError>;

    /// Insert `line`, or add its quantity to the existing line for the same
    /// product and variant. Returns the stored line.
    async fn merge_line(&self, line: CartLine) -> Result<CartLine, StoreError>;
}

#[async_trait::async_trait]
impl<C> CartStore for Arc<C>
where
    C: CartStore + ?Sized,
{
    async fn lines_for(&self, cart_key: &str) -> Result<Vec<CartLine>, StoreError> {
        (**self).lines_for(cart_key).await
    }

    async fn merge_line(&self, line: CartLine) -> Result<CartLine, StoreError> {
        (**self).merge_line(line).await
    }
}
