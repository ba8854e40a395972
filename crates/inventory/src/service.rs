//! Plain CRUD over warehouses, items and transfer history.
//!
//! Each call opens its own unit of work. Reads release it with a rollback;
//! writes commit. An early `?` drops the unit of work, which discards it.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use stockroute_core::{DomainError, InventoryItemId, UserId, WarehouseId};

use crate::store::{
    Database, InventoryFilter, InventoryStore, StoreError, TransferFilter, TransferStore,
    UnitOfWork, WarehouseFilter, WarehouseStore,
};
use crate::{InventoryItem, NewInventoryItem, Sku, TransferRecord, NewWarehouse, Warehouse};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone)]
pub struct WarehouseService<D> {
    db: D,
}

impl<D: Database> WarehouseService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create(&self, input: NewWarehouse) -> ServiceResult<Warehouse> {
        let mut uow = self.db.begin().await?;
        if let Some(manager_id) = input.manager_id {
            ensure_user_exists(&mut uow, manager_id).await?;
        }
        let warehouse = Warehouse::create(input)?;
        uow.save_warehouse(&warehouse).await?;
        uow.commit().await?;
        Ok(warehouse)
    }

    pub async fn get(&self, id: WarehouseId) -> ServiceResult<Warehouse> {
        let mut uow = self.db.begin().await?;
        let warehouse = load_warehouse(&mut uow, id).await?;
        uow.rollback().await?;
        Ok(warehouse)
    }

    /// Filtering by a manager that does not exist is `NotFound`, not an
    /// empty list.
    pub async fn list(&self, filter: WarehouseFilter) -> ServiceResult<Vec<Warehouse>> {
        let mut uow = self.db.begin().await?;
        if let Some(manager_id) = filter.manager_id {
            ensure_user_exists(&mut uow, manager_id).await?;
        }
        let warehouses = uow.list_warehouses(&filter).await?;
        uow.rollback().await?;
        Ok(warehouses)
    }

    pub async fn by_manager(&self, manager_id: UserId) -> ServiceResult<Vec<Warehouse>> {
        self.list(WarehouseFilter {
            manager_id: Some(manager_id),
            active: None,
        })
        .await
    }

    #[instrument(skip(self, input), err)]
    pub async fn update(&self, id: WarehouseId, input: NewWarehouse) -> ServiceResult<Warehouse> {
        let mut uow = self.db.begin().await?;
        let mut warehouse = load_warehouse(&mut uow, id).await?;
        if let Some(manager_id) = input.manager_id {
            ensure_user_exists(&mut uow, manager_id).await?;
        }
        warehouse.apply_update(input)?;
        uow.save_warehouse(&warehouse).await?;
        uow.commit().await?;
        Ok(warehouse)
    }

    /// Soft delete: the row stays, `active` flips to false.
    #[instrument(skip(self), err)]
    pub async fn deactivate(&self, id: WarehouseId) -> ServiceResult<()> {
        let mut uow = self.db.begin().await?;
        let mut warehouse = load_warehouse(&mut uow, id).await?;
        warehouse.deactivate();
        uow.save_warehouse(&warehouse).await?;
        uow.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct InventoryService<D> {
    db: D,
}

impl<D: Database> InventoryService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku, warehouse_id = %input.warehouse_id), err)]
    pub async fn create_item(&self, input: NewInventoryItem) -> ServiceResult<InventoryItem> {
        let mut uow = self.db.begin().await?;
        load_warehouse(&mut uow, input.warehouse_id).await?;
        let item = InventoryItem::create(input, Utc::now())?;
        ensure_sku_free(&mut uow, item.sku(), item.warehouse_id(), None).await?;
        uow.save_item(&item).await?;
        uow.commit().await?;
        Ok(item)
    }

    pub async fn get_item(&self, id: InventoryItemId) -> ServiceResult<InventoryItem> {
        let mut uow = self.db.begin().await?;
        let item = load_item(&mut uow, id).await?;
        uow.rollback().await?;
        Ok(item)
    }

    pub async fn list_items(&self, filter: InventoryFilter) -> ServiceResult<Vec<InventoryItem>> {
        let mut uow = self.db.begin().await?;
        let items = uow.list_items(&filter).await?;
        uow.rollback().await?;
        Ok(items)
    }

    /// Items at or below their reorder point, optionally in one existing
    /// warehouse.
    pub async fn low_stock(&self, warehouse_id: Option<WarehouseId>) -> ServiceResult<Vec<InventoryItem>> {
        let mut uow = self.db.begin().await?;
        if let Some(warehouse_id) = warehouse_id {
            load_warehouse(&mut uow, warehouse_id).await?;
        }
        let items = uow
            .list_items(&InventoryFilter {
                warehouse_id,
                needs_restock: true,
                name_contains: None,
            })
            .await?;
        uow.rollback().await?;
        Ok(items)
    }

    /// Replace every field of an item. Moving it to another warehouse or
    /// changing its SKU re-checks SKU uniqueness at the target.
    #[instrument(skip(self, input), err)]
    pub async fn update_item(
        &self,
        id: InventoryItemId,
        input: NewInventoryItem,
    ) -> ServiceResult<InventoryItem> {
        let mut uow = self.db.begin().await?;
        let mut item = load_item(&mut uow, id).await?;
        if input.warehouse_id != item.warehouse_id() {
            load_warehouse(&mut uow, input.warehouse_id).await?;
        }
        item.replace_with(input, Utc::now())?;
        ensure_sku_free(&mut uow, item.sku(), item.warehouse_id(), Some(id)).await?;
        uow.save_item(&item).await?;
        uow.commit().await?;
        Ok(item)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_item(&self, id: InventoryItemId) -> ServiceResult<()> {
        let mut uow = self.db.begin().await?;
        if !uow.delete_item(id).await? {
            return Err(DomainError::not_found(format!("inventory item {id}")).into());
        }
        uow.commit().await?;
        Ok(())
    }

    /// Apply a signed quantity correction. The result may not go below zero.
    #[instrument(skip(self), err)]
    pub async fn adjust_quantity(&self, id: InventoryItemId, delta: i64) -> ServiceResult<InventoryItem> {
        let mut uow = self.db.begin().await?;
        let mut item = load_item(&mut uow, id).await?;
        item.adjust_quantity(delta, Utc::now())?;
        uow.save_item(&item).await?;
        uow.commit().await?;
        Ok(item)
    }
}

#[derive(Debug, Clone)]
pub struct TransferHistoryService<D> {
    db: D,
}

impl<D: Database> TransferHistoryService<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: TransferFilter) -> ServiceResult<Vec<TransferRecord>> {
        let mut uow = self.db.begin().await?;
        let records = uow.list_transfers(&filter).await?;
        uow.rollback().await?;
        Ok(records)
    }
}

async fn load_warehouse<U: UnitOfWork>(uow: &mut U, id: WarehouseId) -> ServiceResult<Warehouse> {
    uow.find_warehouse(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")).into())
}

async fn load_item<U: UnitOfWork>(uow: &mut U, id: InventoryItemId) -> ServiceResult<InventoryItem> {
    uow.find_item(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("inventory item {id}")).into())
}

async fn ensure_user_exists<U: UnitOfWork>(uow: &mut U, id: UserId) -> ServiceResult<()> {
    match uow.find_user(id).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found(format!("user {id}")).into()),
    }
}

async fn ensure_sku_free<U: UnitOfWork>(
    uow: &mut U,
    sku: &Sku,
    warehouse_id: WarehouseId,
    except: Option<InventoryItemId>,
) -> ServiceResult<()> {
    match uow.find_item_by_sku(sku, warehouse_id).await? {
        Some(existing) if Some(existing.id_typed()) != except => Err(DomainError::conflict(
            format!("sku {sku} already exists in warehouse {warehouse_id}"),
        )
        .into()),
        _ => Ok(()),
    }
}
