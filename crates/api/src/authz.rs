//! API-side authorization guard.
//!
//! Every protected handler checks one permission before touching services,
//! keeping the domain and storage layers auth-agnostic.

use axum::http::StatusCode;
use axum::response::Response;
use tracing::info;

use stockroute_auth::{Permission, authorize};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Check that the caller holds `permission`, or build the 403 response.
pub fn require(principal: &PrincipalContext, permission: &Permission) -> Result<(), Response> {
    authorize(principal.principal(), permission).map_err(|e| {
        info!(
            user_id = %principal.user_id(),
            permission = permission.as_str(),
            "request denied"
        );
        errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use stockroute_auth::{Principal, Role};
    use stockroute_core::UserId;

    use super::*;

    fn ctx(role: Role) -> PrincipalContext {
        PrincipalContext::new(Principal::new(UserId::new(), "tester", role))
    }

    #[test]
    fn admin_passes_every_check() {
        assert!(require(&ctx(Role::Admin), &Permission::WAREHOUSES_WRITE).is_ok());
        assert!(require(&ctx(Role::Admin), &Permission::INVENTORY_TRANSFER).is_ok());
    }

    #[test]
    fn driver_is_read_only() {
        let driver = ctx(Role::DeliveryDriver);
        assert!(require(&driver, &Permission::INVENTORY_READ).is_ok());
        let denied = require(&driver, &Permission::INVENTORY_TRANSFER).unwrap_err();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }
}
