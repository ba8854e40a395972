//! Storage seams for the inventory domain.
//!
//! Every operation goes through a [`UnitOfWork`] obtained from a
//! [`Database`]. Writes made through a unit of work become visible to others
//! only on [`UnitOfWork::commit`]; dropping or rolling back discards them.
//! Implementations must isolate concurrent units of work at least as strongly
//! as serializable execution for the rows they touch.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stockroute_auth::User;
use stockroute_core::{InventoryItemId, TransferId, UserId, WarehouseId};

use crate::{InventoryItem, Sku, TransferRecord, TransferStatus, Warehouse};

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (SKU per warehouse,
    /// username, email).
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// The backend aborted the unit of work because of a concurrent writer.
    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub warehouse_id: Option<WarehouseId>,
    /// Only items at or below their reorder point.
    pub needs_restock: bool,
    /// Case-insensitive substring match on the item name.
    pub name_contains: Option<String>,
}

impl InventoryFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(warehouse_id) = self.warehouse_id {
            if item.warehouse_id() != warehouse_id {
                return false;
            }
        }
        if self.needs_restock && !item.needs_restock() {
            return false;
        }
        if let Some(needle) = &self.name_contains {
            if !item.name().to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarehouseFilter {
    pub manager_id: Option<UserId>,
    pub active: Option<bool>,
}

impl WarehouseFilter {
    pub fn matches(&self, warehouse: &Warehouse) -> bool {
        self.manager_id.is_none_or(|m| warehouse.manager_id == Some(m))
            && self.active.is_none_or(|a| warehouse.active == a)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub source_warehouse_id: Option<WarehouseId>,
    pub destination_warehouse_id: Option<WarehouseId>,
    pub status: Option<TransferStatus>,
}

impl TransferFilter {
    pub fn matches(&self, record: &TransferRecord) -> bool {
        self.source_warehouse_id
            .is_none_or(|w| record.source_warehouse_id == w)
            && self
                .destination_warehouse_id
                .is_none_or(|w| record.destination_warehouse_id == w)
            && self.status.is_none_or(|s| record.status == s)
    }
}

#[async_trait]
pub trait InventoryStore: Send {
    async fn find_item(&mut self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>>;

    /// The item carrying `sku` in `warehouse_id`, if any.
    async fn find_item_by_sku(
        &mut self,
        sku: &Sku,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Option<InventoryItem>>;

    async fn list_items(&mut self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>>;

    /// Insert or replace by id. A second item with the same SKU in the same
    /// warehouse is [`StoreError::Duplicate`].
    async fn save_item(&mut self, item: &InventoryItem) -> StoreResult<()>;

    /// Returns `false` when nothing was deleted.
    async fn delete_item(&mut self, id: InventoryItemId) -> StoreResult<bool>;
}

#[async_trait]
pub trait WarehouseStore: Send {
    async fn find_warehouse(&mut self, id: WarehouseId) -> StoreResult<Option<Warehouse>>;
    async fn list_warehouses(&mut self, filter: &WarehouseFilter) -> StoreResult<Vec<Warehouse>>;
    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()>;
}

#[async_trait]
pub trait UserStore: Send {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;

    /// Insert a new user. Username and email are unique.
    async fn save_user(&mut self, user: &User) -> StoreResult<()>;
}

#[async_trait]
pub trait TransferStore: Send {
    async fn find_transfer(&mut self, id: TransferId) -> StoreResult<Option<TransferRecord>>;

    /// Newest first.
    async fn list_transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<TransferRecord>>;

    async fn save_transfer(&mut self, record: &TransferRecord) -> StoreResult<()>;
}

/// One atomic scope over all four stores.
#[async_trait]
pub trait UnitOfWork: InventoryStore + WarehouseStore + UserStore + TransferStore + Send + Sized {
    async fn commit(self) -> StoreResult<()>;
    async fn rollback(self) -> StoreResult<()>;
}

/// Source of units of work.
#[async_trait]
pub trait Database: Send + Sync {
    type Tx: UnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Tx>;
}

#[async_trait]
impl<D> Database for Arc<D>
where
    D: Database + ?Sized,
{
    type Tx = D::Tx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        (**self).begin().await
    }
}
