//! Runtime choice of storage backend.

use async_trait::async_trait;
use tracing::info;

use stockroute_auth::User;
use stockroute_core::{InventoryItemId, TransferId, UserId, WarehouseId};
use stockroute_inventory::{
    Database, InventoryFilter, InventoryItem, InventoryStore, Sku, StoreResult, TransferFilter,
    TransferRecord, TransferStore, UnitOfWork, UserStore, Warehouse, WarehouseFilter,
    WarehouseStore,
};

use crate::{AppConfig, InMemoryDatabase, InMemoryTx, PgDatabase, PgTx};

#[derive(Debug, Clone)]
pub enum AnyDatabase {
    Memory(InMemoryDatabase),
    Postgres(PgDatabase),
}

impl AnyDatabase {
    /// Postgres when `DATABASE_URL` is configured (schema applied on
    /// connect), in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> StoreResult<Self> {
        match &config.database_url {
            Some(url) => {
                let db = PgDatabase::connect(url).await?;
                db.migrate().await?;
                info!(backend = "postgres", "storage ready");
                Ok(Self::Postgres(db))
            }
            None => {
                info!(backend = "memory", "storage ready; data is lost on exit");
                Ok(Self::Memory(InMemoryDatabase::new()))
            }
        }
    }
}

impl From<InMemoryDatabase> for AnyDatabase {
    fn from(db: InMemoryDatabase) -> Self {
        Self::Memory(db)
    }
}

impl From<PgDatabase> for AnyDatabase {
    fn from(db: PgDatabase) -> Self {
        Self::Postgres(db)
    }
}

#[derive(Debug)]
pub enum AnyTx {
    Memory(InMemoryTx),
    Postgres(PgTx),
}

macro_rules! dispatch {
    ($self:ident, $tx:ident => $call:expr) => {
        match $self {
            AnyTx::Memory($tx) => $call.await,
            AnyTx::Postgres($tx) => $call.await,
        }
    };
}

#[async_trait]
impl Database for AnyDatabase {
    type Tx = AnyTx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        match self {
            AnyDatabase::Memory(db) => db.begin().await.map(AnyTx::Memory),
            AnyDatabase::Postgres(db) => db.begin().await.map(AnyTx::Postgres),
        }
    }
}

#[async_trait]
impl InventoryStore for AnyTx {
    async fn find_item(&mut self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        dispatch!(self, tx => tx.find_item(id))
    }

    async fn find_item_by_sku(
        &mut self,
        sku: &Sku,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Option<InventoryItem>> {
        dispatch!(self, tx => tx.find_item_by_sku(sku, warehouse_id))
    }

    async fn list_items(&mut self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
        dispatch!(self, tx => tx.list_items(filter))
    }

    async fn save_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
        dispatch!(self, tx => tx.save_item(item))
    }

    async fn delete_item(&mut self, id: InventoryItemId) -> StoreResult<bool> {
        dispatch!(self, tx => tx.delete_item(id))
    }
}

#[async_trait]
impl WarehouseStore for AnyTx {
    async fn find_warehouse(&mut self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
        dispatch!(self, tx => tx.find_warehouse(id))
    }

    async fn list_warehouses(&mut self, filter: &WarehouseFilter) -> StoreResult<Vec<Warehouse>> {
        dispatch!(self, tx => tx.list_warehouses(filter))
    }

    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()> {
        dispatch!(self, tx => tx.save_warehouse(warehouse))
    }
}

#[async_trait]
impl UserStore for AnyTx {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        dispatch!(self, tx => tx.find_user(id))
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        dispatch!(self, tx => tx.find_user_by_username(username))
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        dispatch!(self, tx => tx.save_user(user))
    }
}

#[async_trait]
impl TransferStore for AnyTx {
    async fn find_transfer(&mut self, id: TransferId) -> StoreResult<Option<TransferRecord>> {
        dispatch!(self, tx => tx.find_transfer(id))
    }

    async fn list_transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<TransferRecord>> {
        dispatch!(self, tx => tx.list_transfers(filter))
    }

    async fn save_transfer(&mut self, record: &TransferRecord) -> StoreResult<()> {
        dispatch!(self, tx => tx.save_transfer(record))
    }
}

#[async_trait]
impl UnitOfWork for AnyTx {
    async fn commit(self) -> StoreResult<()> {
        dispatch!(self, tx => tx.commit())
    }

    async fn rollback(self) -> StoreResult<()> {
        dispatch!(self, tx => tx.rollback())
    }
}
