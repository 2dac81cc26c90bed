//! Order domain module.
//!
//! Orders, their items, the status state machine and the audit entries it
//! produces. Everything here is deterministic: the transition functions return
//! a plan (new order state, stock demand, history changes) and leave applying it
//! to the infrastructure layer.

pub mod history;
pub mod notification;
pub mod order;
pub mod status;
pub mod transition;

pub use history::{StatusChange, StatusHistoryEntry};
pub use notification::{NotificationKind, NotificationMessage, OrderSnapshot, SnapshotItem};
pub use order::{NewOrderItem, Order, OrderItem, PlaceOrder, ShippingAddress, Totals};
pub use status::{FulfillmentStatus, OrderStatus, PaymentStatus, derive_fulfillment};
pub use transition::{
    DEFAULT_CANCELLATION_REASON, InventoryEffect, ItemFulfillmentUpdate, OrderUpdate,
    TransitionPlan, ensure_cancellable, inventory_effect, plan_cancellation, plan_update,
    stock_demand, validate_status_edit,
};
