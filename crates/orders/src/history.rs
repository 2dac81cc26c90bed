//! Append-only audit entries for order status and payment status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{HistoryEntryId, OrderId, UserId};

use crate::status::{OrderStatus, PaymentStatus};

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusChange {
    Order { from: OrderStatus, to: OrderStatus },
    Payment { from: PaymentStatus, to: PaymentStatus },
}

impl StatusChange {
    pub fn kind(&self) -> &'static str {
        match self {
            StatusChange::Order { .. } => "order",
            StatusChange::Payment { .. } => "payment",
        }
    }

    pub fn from_label(&self) -> &'static str {
        match self {
            StatusChange::Order { from, .. } => from.as_str(),
            StatusChange::Payment { from, .. } => from.as_str(),
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            StatusChange::Order { to, .. } => to.as_str(),
            StatusChange::Payment { to, .. } => to.as_str(),
        }
    }
}

/// Immutable audit record. Never updated or deleted once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryEntryId,
    pub order_id: OrderId,
    pub change: StatusChange,
    pub note: Option<String>,
    pub actor: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn record(
        order_id: OrderId,
        change: StatusChange,
        note: Option<String>,
        actor: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryEntryId::new(),
            order_id,
            change,
            note,
            actor,
            created_at: at,
        }
    }
}
