//! Inventory domain module.
//!
//! Warehouses, per-warehouse inventory items and the inter-warehouse transfer
//! workflow. Storage is reached only through the traits in [`store`]; every
//! multi-step operation runs inside one [`store::UnitOfWork`].

pub mod coordinator;
pub mod item;
pub mod service;
pub mod store;
pub mod transfer;
pub mod warehouse;

pub use coordinator::{DestinationResolution, EntityKind, TransferCoordinator, TransferError};
pub use item::{InventoryItem, NewInventoryItem, Sku};
pub use service::{
    InventoryService, ServiceError, ServiceResult, TransferHistoryService, WarehouseService,
};
pub use store::{
    Database, InventoryFilter, InventoryStore, StoreError, StoreResult, TransferFilter,
    TransferStore, UnitOfWork, UserStore, WarehouseFilter, WarehouseStore,
};
pub use transfer::{TransferRecord, TransferRequest, TransferStatus};
pub use warehouse::{ContactInfo, NewWarehouse, Warehouse};
