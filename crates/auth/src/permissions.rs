use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are opaque strings (e.g. "orders.update"). The wildcard `"*"`
/// grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));
    /// Read any customer's orders.
    pub const ORDERS_READ_ANY: Permission = Permission(Cow::Borrowed("orders.read_any"));
    /// Apply administrative status/payment/fulfillment edits.
    pub const ORDERS_UPDATE: Permission = Permission(Cow::Borrowed("orders.update"));
    /// Cancel any customer's order.
    pub const ORDERS_CANCEL_ANY: Permission = Permission(Cow::Borrowed("orders.cancel"));
    /// Create or replace stock rows.
    pub const INVENTORY_MANAGE: Permission = Permission(Cow::Borrowed("inventory.manage"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role → permission policy.
///
/// `admin` grants the wildcard. Customers get no elevated permissions; their
/// access to their own orders is an ownership check, not a permission.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(Role::is_admin) {
        return vec![Permission::WILDCARD];
    }
    Vec::new()
}
