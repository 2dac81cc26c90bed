//! Append-only status history.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryAuditTrail;
pub use postgres::PostgresAuditTrail;
pub use r#trait::AuditTrail;
