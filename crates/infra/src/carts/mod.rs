//! Cart line storage, keyed by an opaque cart key.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use r#trait::CartStore;
