//! Storage and service error taxonomy.
//!
//! Adapters return `StoreError`; services return `ServiceError`, which is what
//! callers (the HTTP layer) map to status codes.

use thiserror::Error;

use storefront_cart::CartRejection;
use storefront_core::DomainError;

/// Storage adapter failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete the operation (connection, IO, poisoned lock).
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A conditional write lost (stale version, duplicate key).
    #[error("write conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Error surfaced by `TransitionEngine` and `CartService`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("product is out of stock")]
    OutOfStock,

    #[error("only {available} left in stock ({requested} requested)")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidTransition(msg) => ServiceError::InvalidTransition(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::Forbidden => ServiceError::Forbidden,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<CartRejection> for ServiceError {
    fn from(value: CartRejection) -> Self {
        match value {
            CartRejection::OutOfStock => ServiceError::OutOfStock,
            CartRejection::InsufficientStock {
                available,
                requested,
            } => ServiceError::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

/// Map SQLx errors into `StoreError`.
///
/// | SQLx error                       | code    | StoreError |
/// |----------------------------------|---------|------------|
/// | Database (unique violation)      | `23505` | `Conflict` |
/// | Database (check violation)       | `23514` | `Corrupt`  |
/// | Database (other) / pool / IO     | -       | `Backend`  |
/// | ColumnDecode / Decode            | -       | `Corrupt`  |
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Corrupt(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("failed to decode row in {}: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_stay_conflicts_and_the_rest_is_internal() {
        assert_eq!(
            ServiceError::from(StoreError::Conflict("stale".into())),
            ServiceError::Conflict("stale".into())
        );
        assert!(matches!(
            ServiceError::from(StoreError::Backend("down".into())),
            ServiceError::Internal(_)
        ));
    }

    #[test]
    fn cart_rejections_keep_available_quantity() {
        assert_eq!(
            ServiceError::from(CartRejection::InsufficientStock {
                available: 3,
                requested: 6
            }),
            ServiceError::InsufficientStock {
                available: 3,
                requested: 6
            }
        );
        assert_eq!(
            ServiceError::from(DomainError::invalid_transition("no")),
            ServiceError::InvalidTransition("no".into())
        );
    }
}
