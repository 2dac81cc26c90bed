//! Cart domain module.
//!
//! Cart lines and the add-to-cart stock guard. The guard reads the same
//! availability numbers the order engine deducts from, so "add to cart" and
//! "can this order take stock" agree.

pub mod availability;
pub mod line;

pub use availability::{CartAcceptance, CartRejection, check_cart_addition};
pub use line::{AddToCart, CartLine};
