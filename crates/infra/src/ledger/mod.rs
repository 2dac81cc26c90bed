//! Inventory ledger: one stock row per product or product variant.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryLedger;
pub use postgres::PostgresInventoryLedger;
pub use r#trait::InventoryLedger;
