//! Closed status sets for orders, payments and fulfillment.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use storefront_core::DomainError;

/// Order status lifecycle.
///
/// `pending → confirmed → processing → shipped → delivered`, with the side
/// branches `cancelled` and `refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Statuses in which stock for the order has been taken out of the ledger.
    pub fn holds_stock(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Processing
                | OrderStatus::Shipped
                | OrderStatus::Delivered
        )
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown order status '{s}' (expected one of: pending, confirmed, processing, shipped, delivered, cancelled, refunded)"
                ))
            })
    }
}

/// Payment status, owned by the payment collaborator but recorded on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Voided,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Refunded,
        PaymentStatus::Voided,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Voided => "voided",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown payment status '{s}' (expected one of: pending, paid, failed, refunded, voided)"
                ))
            })
    }
}

/// Fulfillment state, used both per item and as the order-level aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentStatus {
    Unfulfilled,
    Partial,
    Fulfilled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Unfulfilled => "unfulfilled",
            FulfillmentStatus::Partial => "partial",
            FulfillmentStatus::Fulfilled => "fulfilled",
        }
    }
}

impl core::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unfulfilled" => Ok(FulfillmentStatus::Unfulfilled),
            "partial" => Ok(FulfillmentStatus::Partial),
            "fulfilled" => Ok(FulfillmentStatus::Fulfilled),
            other => Err(DomainError::validation(format!(
                "unknown fulfillment status '{other}' (expected one of: unfulfilled, partial, fulfilled)"
            ))),
        }
    }
}

/// Aggregate fulfillment from item-level statuses.
///
/// All fulfilled → `fulfilled`; nothing fulfilled or partially fulfilled (or no
/// items at all) → `unfulfilled`; anything else → `partial`.
pub fn derive_fulfillment<I>(items: I) -> FulfillmentStatus
where
    I: IntoIterator<Item = FulfillmentStatus>,
{
    let mut total = 0usize;
    let mut fulfilled = 0usize;
    let mut started = 0usize;

    for status in items {
        total += 1;
        match status {
            FulfillmentStatus::Fulfilled => {
                fulfilled += 1;
                started += 1;
            }
            FulfillmentStatus::Partial => started += 1,
            FulfillmentStatus::Unfulfilled => {}
        }
    }

    if total > 0 && fulfilled == total {
        FulfillmentStatus::Fulfilled
    } else if started == 0 {
        FulfillmentStatus::Unfulfilled
    } else {
        FulfillmentStatus::Partial
    }
}
