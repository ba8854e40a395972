use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Permission;

/// Closed set of roles a user can hold.
///
/// On the wire a role is its snake_case value (`"logistics_manager"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Admin,
    LogisticsManager,
    WarehouseStaff,
    DeliveryDriver,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "invalid role '{0}'; valid values are: admin, logistics_manager, warehouse_staff, delivery_driver"
)]
pub struct RoleParseError(pub String);

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::LogisticsManager,
        Role::WarehouseStaff,
        Role::DeliveryDriver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::LogisticsManager => "logistics_manager",
            Role::WarehouseStaff => "warehouse_staff",
            Role::DeliveryDriver => "delivery_driver",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::LogisticsManager => "LOGISTICS_MANAGER",
            Role::WarehouseStaff => "WAREHOUSE_STAFF",
            Role::DeliveryDriver => "DELIVERY_DRIVER",
        }
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Admin => &ADMIN_PERMISSIONS,
            Role::LogisticsManager => &LOGISTICS_MANAGER_PERMISSIONS,
            Role::WarehouseStaff => &WAREHOUSE_STAFF_PERMISSIONS,
            Role::DeliveryDriver => &DELIVERY_DRIVER_PERMISSIONS,
        }
    }
}

static ADMIN_PERMISSIONS: [Permission; 1] = [Permission::ALL];

static LOGISTICS_MANAGER_PERMISSIONS: [Permission; 6] = [
    Permission::WAREHOUSES_READ,
    Permission::WAREHOUSES_WRITE,
    Permission::INVENTORY_READ,
    Permission::INVENTORY_WRITE,
    Permission::INVENTORY_TRANSFER,
    Permission::TRANSFERS_READ,
];

static WAREHOUSE_STAFF_PERMISSIONS: [Permission; 5] = [
    Permission::WAREHOUSES_READ,
    Permission::INVENTORY_READ,
    Permission::INVENTORY_WRITE,
    Permission::INVENTORY_TRANSFER,
    Permission::TRANSFERS_READ,
];

static DELIVERY_DRIVER_PERMISSIONS: [Permission; 3] = [
    Permission::WAREHOUSES_READ,
    Permission::INVENTORY_READ,
    Permission::TRANSFERS_READ,
];

impl FromStr for Role {
    type Err = RoleParseError;

    /// Accepts the wire value or the variant name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| {
                r.as_str().eq_ignore_ascii_case(trimmed)
                    || r.variant_name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| RoleParseError(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
