//! API-side authorization guards.
//!
//! Permissions are checked at the route boundary, before any service call;
//! the services themselves only know about order ownership.

use storefront_auth::{AuthzError, Permission, authorize};
use storefront_infra::OrderAccess;

use crate::context::PrincipalContext;

/// Require a single permission in the current request context.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), AuthzError> {
    authorize(&principal.principal(), permission)
}

/// Callers holding `elevated` act on any order; everyone else on their own.
pub fn order_access(principal: &PrincipalContext, elevated: &Permission) -> OrderAccess {
    if principal.principal().has(elevated) {
        OrderAccess::Any
    } else {
        OrderAccess::OwnedBy(principal.user_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::Role;
    use storefront_core::UserId;

    #[test]
    fn admins_act_on_any_order_and_customers_on_their_own() {
        let admin = PrincipalContext::new(UserId::new(), vec![Role::ADMIN]);
        let customer = PrincipalContext::new(UserId::new(), vec![Role::CUSTOMER]);

        assert_eq!(
            order_access(&admin, &Permission::ORDERS_READ_ANY),
            OrderAccess::Any
        );
        assert_eq!(
            order_access(&customer, &Permission::ORDERS_READ_ANY),
            OrderAccess::OwnedBy(customer.user_id())
        );
        assert!(require(&customer, &Permission::ORDERS_UPDATE).is_err());
        assert!(require(&admin, &Permission::INVENTORY_MANAGE).is_ok());
    }
}
