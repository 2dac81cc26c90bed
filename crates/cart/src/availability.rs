//! Add-to-cart stock guard.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_inventory::Availability;

/// Why an addition was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartAcceptance {
    InStock,
    /// Stock is exhausted (or short) but the row allows backorders.
    PreOrder,
    /// No tracked stock row; the catalog decides availability.
    Untracked,
}

/// Structured rejection surfaced to the shopper.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CartRejection {
    #[error("product is out of stock")]
    OutOfStock,

    #[error("only {available} left in stock ({requested} requested)")]
    InsufficientStock { available: i64, requested: i64 },
}

impl CartRejection {
    pub fn code(&self) -> &'static str {
        match self {
            CartRejection::OutOfStock => "OUT_OF_STOCK",
            CartRejection::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
        }
    }

    pub fn available_quantity(&self) -> i64 {
        match self {
            CartRejection::OutOfStock => 0,
            CartRejection::InsufficientStock { available, .. } => *available,
        }
    }
}

/// Decide whether `requested` more units may join `already_in_cart` units.
///
/// `availability` is `None` when the ledger has no row for the product.
pub fn check_cart_addition(
    availability: Option<&Availability>,
    already_in_cart: i64,
    requested: i64,
) -> Result<CartAcceptance, CartRejection> {
    let Some(a) = availability else {
        return Ok(CartAcceptance::Untracked);
    };
    if !a.tracked {
        return Ok(CartAcceptance::Untracked);
    }

    if a.current_quantity <= 0 {
        return if a.allows_backorder {
            Ok(CartAcceptance::PreOrder)
        } else {
            Err(CartRejection::OutOfStock)
        };
    }

    let total = already_in_cart.max(0).saturating_add(requested);
    if total > a.current_quantity {
        return if a.allows_backorder {
            Ok(CartAcceptance::PreOrder)
        } else {
            Err(CartRejection::InsufficientStock {
                available: a.current_quantity,
                requested: total,
            })
        };
    }

    Ok(CartAcceptance::InStock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn availability(quantity: i64, tracked: bool, backorder: bool) -> Availability {
        Availability {
            available: !tracked || backorder || quantity > 0,
            current_quantity: quantity,
            allows_backorder: backorder,
            tracked,
        }
    }

    #[test]
    fn six_requested_against_three_is_insufficient() {
        let err = check_cart_addition(Some(&availability(3, true, false)), 0, 6).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert_eq!(err.available_quantity(), 3);
    }

    #[test]
    fn existing_cart_quantity_counts_toward_the_limit() {
        let a = availability(5, true, false);
        assert_eq!(check_cart_addition(Some(&a), 2, 3), Ok(CartAcceptance::InStock));
        assert!(matches!(
            check_cart_addition(Some(&a), 3, 3),
            Err(CartRejection::InsufficientStock { available: 5, requested: 6 })
        ));
    }

    #[test]
    fn zero_stock_is_out_of_stock_unless_backorderable() {
        let err = check_cart_addition(Some(&availability(0, true, false)), 0, 1).unwrap_err();
        assert_eq!(err, CartRejection::OutOfStock);
        assert_eq!(err.code(), "OUT_OF_STOCK");

        assert_eq!(
            check_cart_addition(Some(&availability(0, true, true)), 0, 4),
            Ok(CartAcceptance::PreOrder)
        );
    }

    #[test]
    fn untracked_or_missing_rows_always_accept() {
        assert_eq!(
            check_cart_addition(Some(&availability(0, false, false)), 10, 10),
            Ok(CartAcceptance::Untracked)
        );
        assert_eq!(check_cart_addition(None, 0, 1_000), Ok(CartAcceptance::Untracked));
    }

    proptest! {
        /// Property: without backorder, an accepted addition never exceeds stock.
        #[test]
        fn accepted_totals_fit_in_stock(
            stock in 0i64..50,
            in_cart in 0i64..50,
            requested in 1i64..50
        ) {
            let a = availability(stock, true, false);
            if check_cart_addition(Some(&a), in_cart, requested).is_ok() {
                prop_assert!(in_cart + requested <= stock);
            }
        }
    }
}
