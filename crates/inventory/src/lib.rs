//! Inventory domain module.
//!
//! Stock rows, their classification, and the clamped deduct/restore arithmetic.
//! Pure deterministic domain logic (no IO, no HTTP, no storage); the atomic
//! read-modify-write around it is the storage adapter's job.

pub mod record;

pub use record::{
    Availability, InventoryRecord, MovementKind, StockKey, StockMovement, StockStatus, classify,
    clamped_deduction,
};
