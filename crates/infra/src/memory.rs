//! In-memory storage backend for tests and local development.
//!
//! All tables sit behind one async mutex. A unit of work holds the lock for
//! its whole lifetime and edits a private copy of the tables, which replaces
//! the shared state on commit. Units of work therefore run one at a time,
//! which is trivially serializable.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockroute_auth::User;
use stockroute_core::{InventoryItemId, TransferId, UserId, WarehouseId};
use stockroute_inventory::{
    Database, InventoryFilter, InventoryItem, InventoryStore, Sku, StoreError, StoreResult,
    TransferFilter, TransferRecord, TransferStore, UnitOfWork, UserStore, Warehouse,
    WarehouseFilter, WarehouseStore,
};

const NO_FAULT: u64 = u64::MAX;

#[derive(Debug, Clone, Default)]
struct Tables {
    items: HashMap<InventoryItemId, InventoryItem>,
    warehouses: HashMap<WarehouseId, Warehouse>,
    users: HashMap<UserId, User>,
    transfers: HashMap<TransferId, TransferRecord>,
}

/// Shared handle to the in-memory tables. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryDatabase {
    tables: Arc<Mutex<Tables>>,
    writes_until_fault: Arc<AtomicU64>,
    begins: Arc<AtomicU64>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            writes_until_fault: Arc::new(AtomicU64::new(NO_FAULT)),
            begins: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Let the next `writes` store writes succeed, then fail every write
    /// after that with [`StoreError::Backend`] until [`Self::clear_faults`].
    pub fn fail_writes_after(&self, writes: u64) {
        self.writes_until_fault.store(writes, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.writes_until_fault.store(NO_FAULT, Ordering::SeqCst);
    }

    /// How many units of work have been opened so far.
    pub fn begin_count(&self) -> u64 {
        self.begins.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    type Tx = InMemoryTx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx {
            guard,
            working,
            writes_until_fault: self.writes_until_fault.clone(),
        })
    }
}

/// Exclusive unit of work over [`InMemoryDatabase`].
///
/// Dropping it without [`UnitOfWork::commit`] discards every write.
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    writes_until_fault: Arc<AtomicU64>,
}

impl core::fmt::Debug for InMemoryTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryTx")
            .field("items", &self.working.items.len())
            .field("transfers", &self.working.transfers.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryTx {
    fn check_write(&self) -> StoreResult<()> {
        let budget = self
            .writes_until_fault
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                NO_FAULT => Some(NO_FAULT),
                0 => None,
                n => Some(n - 1),
            });
        match budget {
            Ok(_) => Ok(()),
            Err(_) => Err(StoreError::Backend("injected write failure".to_string())),
        }
    }
}

#[async_trait]
impl InventoryStore for InMemoryTx {
    async fn find_item(&mut self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn find_item_by_sku(
        &mut self,
        sku: &Sku,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Option<InventoryItem>> {
        Ok(self
            .working
            .items
            .values()
            .find(|item| item.warehouse_id() == warehouse_id && item.sku() == sku)
            .cloned())
    }

    async fn list_items(&mut self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
        let mut items: Vec<_> = self
            .working
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.id_typed());
        Ok(items)
    }

    async fn save_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
        self.check_write()?;
        let clash = self.working.items.values().any(|other| {
            other.id_typed() != item.id_typed()
                && other.warehouse_id() == item.warehouse_id()
                && other.sku() == item.sku()
        });
        if clash {
            return Err(StoreError::Duplicate(format!(
                "sku {} already exists in warehouse {}",
                item.sku(),
                item.warehouse_id()
            )));
        }
        self.working.items.insert(item.id_typed(), item.clone());
        Ok(())
    }

    async fn delete_item(&mut self, id: InventoryItemId) -> StoreResult<bool> {
        self.check_write()?;
        Ok(self.working.items.remove(&id).is_some())
    }
}

#[async_trait]
impl WarehouseStore for InMemoryTx {
    async fn find_warehouse(&mut self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
        Ok(self.working.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&mut self, filter: &WarehouseFilter) -> StoreResult<Vec<Warehouse>> {
        let mut warehouses: Vec<_> = self
            .working
            .warehouses
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        warehouses.sort_by_key(|w| w.id);
        Ok(warehouses)
    }

    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()> {
        self.check_write()?;
        self.working.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryTx {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        self.check_write()?;
        for other in self.working.users.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(StoreError::Duplicate(format!(
                    "username '{}' is already taken",
                    user.username
                )));
            }
            if other.email == user.email {
                return Err(StoreError::Duplicate(format!(
                    "email '{}' is already registered",
                    user.email
                )));
            }
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl TransferStore for InMemoryTx {
    async fn find_transfer(&mut self, id: TransferId) -> StoreResult<Option<TransferRecord>> {
        Ok(self.working.transfers.get(&id).cloned())
    }

    async fn list_transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<TransferRecord>> {
        let mut records: Vec<_> = self
            .working
            .transfers
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn save_transfer(&mut self, record: &TransferRecord) -> StoreResult<()> {
        self.check_write()?;
        self.working.transfers.insert(record.id, record.clone());
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryTx {
    async fn commit(self) -> StoreResult<()> {
        let InMemoryTx {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use stockroute_auth::Role;
    use stockroute_inventory::{ContactInfo, NewInventoryItem, NewWarehouse};

    use super::*;

    fn warehouse() -> Warehouse {
        Warehouse::create(NewWarehouse {
            name: "Depot".to_string(),
            location: "Bristol".to_string(),
            capacity: None,
            manager_id: None,
            contact: ContactInfo::default(),
        })
        .unwrap()
    }

    fn item(warehouse_id: WarehouseId, sku: &str) -> InventoryItem {
        InventoryItem::create(
            NewInventoryItem {
                warehouse_id,
                name: "Crate".to_string(),
                description: None,
                sku: sku.to_string(),
                quantity: 4,
                reorder_point: 1,
                reorder_quantity: 2,
                unit_price_cents: 700,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn user(username: &str, email: &str) -> User {
        User {
            id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::WarehouseStaff,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let db = InMemoryDatabase::new();
        let wh = warehouse();

        let mut uow = db.begin().await.unwrap();
        uow.save_warehouse(&wh).await.unwrap();
        drop(uow);

        let mut uow = db.begin().await.unwrap();
        assert!(uow.find_warehouse(wh.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_units() {
        let db = InMemoryDatabase::new();
        let wh = warehouse();

        let mut uow = db.begin().await.unwrap();
        uow.save_warehouse(&wh).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert_eq!(uow.find_warehouse(wh.id).await.unwrap(), Some(wh));
        assert_eq!(db.begin_count(), 2);
    }

    #[tokio::test]
    async fn same_sku_in_same_warehouse_is_duplicate() {
        let db = InMemoryDatabase::new();
        let wh = warehouse();
        let mut uow = db.begin().await.unwrap();

        uow.save_item(&item(wh.id, "A-1")).await.unwrap();
        uow.save_item(&item(WarehouseId::new(), "A-1")).await.unwrap();
        let err = uow.save_item(&item(wh.id, "A-1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn usernames_and_emails_are_unique() {
        let db = InMemoryDatabase::new();
        let mut uow = db.begin().await.unwrap();

        uow.save_user(&user("ana", "ana@example.com")).await.unwrap();
        assert!(matches!(
            uow.save_user(&user("ana", "other@example.com")).await,
            Err(StoreError::Duplicate(_))
        ));
        assert!(matches!(
            uow.save_user(&user("bob", "ana@example.com")).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn injected_fault_fails_writes_past_the_budget() {
        let db = InMemoryDatabase::new();
        db.fail_writes_after(1);
        let mut uow = db.begin().await.unwrap();

        uow.save_warehouse(&warehouse()).await.unwrap();
        assert!(matches!(
            uow.save_warehouse(&warehouse()).await,
            Err(StoreError::Backend(_))
        ));

        db.clear_faults();
        uow.save_warehouse(&warehouse()).await.unwrap();
    }
}
