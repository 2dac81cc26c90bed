use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, ProductId, VariantId};

/// Ledger key: one stock row per product, or per product variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockKey {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
}

impl StockKey {
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }

    pub fn product(product_id: ProductId) -> Self {
        Self::new(product_id, None)
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.variant_id {
            Some(v) => write!(f, "{}/{}", self.product_id, v),
            None => core::fmt::Display::fmt(&self.product_id, f),
        }
    }
}

/// Stock classification shown to shoppers and used for low-stock reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    PreOrder,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::PreOrder => "pre_order",
        }
    }
}

/// Result of a read-only availability check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    pub current_quantity: i64,
    pub allows_backorder: bool,
    pub tracked: bool,
}

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Deduct,
    Restore,
}

/// Outcome of a single deduct/restore against one stock row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub key: StockKey,
    pub kind: MovementKind,
    pub requested: i64,
    pub previous: i64,
    pub current: i64,
    /// `false` when the row has tracking disabled and nothing was changed.
    pub tracked: bool,
}

impl StockMovement {
    /// Quantity that actually moved (may be less than requested for a clamped deduction).
    pub fn applied(&self) -> i64 {
        (self.current - self.previous).abs()
    }

    /// Requested quantity that could not be deducted because stock ran out.
    pub fn shortfall(&self) -> i64 {
        match self.kind {
            MovementKind::Deduct if self.tracked => self.requested - self.applied(),
            _ => 0,
        }
    }

    pub fn is_clamped(&self) -> bool {
        self.shortfall() > 0
    }
}

/// Stock row for a product (or product variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub key: StockKey,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    /// When `false` the row is advisory: it never blocks and is never mutated by orders.
    pub track_inventory: bool,
    pub allow_backorder: bool,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    pub fn new(
        key: StockKey,
        quantity: i64,
        low_stock_threshold: i64,
        track_inventory: bool,
        allow_backorder: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if low_stock_threshold < 0 {
            return Err(DomainError::validation(
                "low_stock_threshold cannot be negative",
            ));
        }

        Ok(Self {
            key,
            quantity,
            low_stock_threshold,
            track_inventory,
            allow_backorder,
            updated_at: now,
        })
    }

    pub fn classify(&self) -> StockStatus {
        classify(self)
    }

    /// Read-only check: can `requested` units be taken from this row?
    pub fn availability(&self, requested: i64) -> Availability {
        let available =
            !self.track_inventory || self.allow_backorder || self.quantity >= requested;
        Availability {
            available,
            current_quantity: self.quantity,
            allows_backorder: self.allow_backorder,
            tracked: self.track_inventory,
        }
    }

    /// Subtract `qty`, flooring at zero. Untracked rows are left untouched.
    pub fn deduct(&mut self, qty: i64, now: DateTime<Utc>) -> StockMovement {
        let previous = self.quantity;
        if self.track_inventory {
            self.quantity = clamped_deduction(self.quantity, qty);
            self.updated_at = now;
        }
        StockMovement {
            key: self.key,
            kind: MovementKind::Deduct,
            requested: qty,
            previous,
            current: self.quantity,
            tracked: self.track_inventory,
        }
    }

    /// Add `qty` back. Untracked rows are left untouched.
    pub fn restore(&mut self, qty: i64, now: DateTime<Utc>) -> StockMovement {
        let previous = self.quantity;
        if self.track_inventory {
            self.quantity = self.quantity.saturating_add(qty.max(0));
            self.updated_at = now;
        }
        StockMovement {
            key: self.key,
            kind: MovementKind::Restore,
            requested: qty,
            previous,
            current: self.quantity,
            tracked: self.track_inventory,
        }
    }
}

/// `quantity - qty`, never below zero. Negative requests are treated as zero.
pub fn clamped_deduction(quantity: i64, qty: i64) -> i64 {
    quantity.saturating_sub(qty.max(0)).max(0)
}

/// Classify a stock row.
///
/// - `out_of_stock`: quantity 0, backorder disallowed
/// - `pre_order`: quantity 0, backorder allowed
/// - `low_stock`: 0 < quantity <= threshold
/// - `in_stock`: otherwise
pub fn classify(record: &InventoryRecord) -> StockStatus {
    if record.quantity <= 0 {
        if record.allow_backorder {
            StockStatus::PreOrder
        } else {
            StockStatus::OutOfStock
        }
    } else if record.quantity <= record.low_stock_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(quantity: i64, threshold: i64, tracked: bool, backorder: bool) -> InventoryRecord {
        InventoryRecord::new(
            StockKey::product(ProductId::new()),
            quantity,
            threshold,
            tracked,
            backorder,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn classification_follows_quantity_threshold_and_backorder() {
        assert_eq!(record(0, 5, true, false).classify(), StockStatus::OutOfStock);
        assert_eq!(record(0, 5, true, true).classify(), StockStatus::PreOrder);
        assert_eq!(record(5, 5, true, false).classify(), StockStatus::LowStock);
        assert_eq!(record(1, 5, true, false).classify(), StockStatus::LowStock);
        assert_eq!(record(6, 5, true, false).classify(), StockStatus::InStock);
        assert_eq!(record(3, 0, true, false).classify(), StockStatus::InStock);
    }

    #[test]
    fn deduct_clamps_at_zero_and_reports_shortfall() {
        let mut r = record(3, 0, true, false);
        let m = r.deduct(5, Utc::now());
        assert_eq!(r.quantity, 0);
        assert_eq!(m.previous, 3);
        assert_eq!(m.current, 0);
        assert_eq!(m.applied(), 3);
        assert_eq!(m.shortfall(), 2);
        assert!(m.is_clamped());
    }

    #[test]
    fn untracked_rows_are_never_mutated_and_always_available() {
        let mut r = record(2, 0, false, false);
        let m = r.deduct(10, Utc::now());
        assert_eq!(r.quantity, 2);
        assert!(!m.tracked);
        assert_eq!(m.shortfall(), 0);

        let m = r.restore(10, Utc::now());
        assert_eq!(r.quantity, 2);
        assert_eq!(m.applied(), 0);

        assert!(r.availability(100).available);
    }

    #[test]
    fn availability_respects_backorder() {
        let r = record(3, 0, true, false);
        assert!(r.availability(3).available);
        assert!(!r.availability(4).available);

        let r = record(0, 0, true, true);
        let a = r.availability(10);
        assert!(a.available);
        assert!(a.allows_backorder);
        assert_eq!(a.current_quantity, 0);
    }

    #[test]
    fn negative_quantities_are_rejected_on_construction() {
        let err = InventoryRecord::new(
            StockKey::product(ProductId::new()),
            -1,
            0,
            true,
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deduct(i64),
        Restore(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-5i64..50).prop_map(Op::Deduct),
            (-5i64..50).prop_map(Op::Restore),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: no sequence of deduct/restore calls drives a row below zero.
        #[test]
        fn quantity_never_drops_below_zero(
            start in 0i64..100,
            ops in prop::collection::vec(op(), 0..40)
        ) {
            let mut r = record(start, 5, true, false);
            for op in ops {
                match op {
                    Op::Deduct(q) => { r.deduct(q, Utc::now()); }
                    Op::Restore(q) => { r.restore(q, Utc::now()); }
                }
                prop_assert!(r.quantity >= 0);
            }
        }

        /// Property: an unclamped deduction followed by an equal restore is a no-op.
        #[test]
        fn deduct_then_restore_round_trips(start in 0i64..1_000, qty in 0i64..1_000) {
            prop_assume!(qty <= start);
            let mut r = record(start, 5, true, false);
            r.deduct(qty, Utc::now());
            r.restore(qty, Utc::now());
            prop_assert_eq!(r.quantity, start);
        }
    }
}
