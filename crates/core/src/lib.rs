//! `storefront-core` — shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::{CartLineId, HistoryEntryId, OrderId, OrderItemId, ProductId, UserId, VariantId};
pub use version::ExpectedVersion;
