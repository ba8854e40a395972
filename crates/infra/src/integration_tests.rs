//! End-to-end tests for the transfer workflow and CRUD services on the
//! in-memory backend.
//!
//! Verifies:
//! - Validation order and error reporting of transfers
//! - Merge-or-create reconciliation at the destination
//! - All-or-nothing behaviour when a write fails mid-transfer
//! - Quantities stay consistent under concurrent transfers

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use proptest::prelude::*;

    use stockroute_auth::{Role, User};
    use stockroute_core::{DomainError, InventoryItemId, TransferId, UserId, WarehouseId};
    use stockroute_inventory::{
        ContactInfo, Database, EntityKind, InventoryFilter, InventoryItem, InventoryService,
        InventoryStore, NewInventoryItem, NewWarehouse, ServiceError, Sku, StoreError, StoreResult,
        TransferCoordinator, TransferError, TransferFilter, TransferHistoryService, TransferRecord,
        TransferRequest, TransferStatus, TransferStore, UnitOfWork, UserStore, Warehouse,
        WarehouseFilter, WarehouseService, WarehouseStore,
    };

    use crate::memory::{InMemoryDatabase, InMemoryTx};

    struct Fixture {
        db: InMemoryDatabase,
        coordinator: TransferCoordinator<InMemoryDatabase>,
        source_warehouse: WarehouseId,
        destination_warehouse: WarehouseId,
        user: UserId,
    }

    fn new_warehouse(name: &str) -> Warehouse {
        Warehouse::create(NewWarehouse {
            name: name.to_string(),
            location: "Rotterdam".to_string(),
            capacity: Some(10_000),
            manager_id: None,
            contact: ContactInfo::default(),
        })
        .unwrap()
    }

    fn new_item(warehouse_id: WarehouseId, sku: &str, quantity: i64, reorder_point: i64) -> InventoryItem {
        InventoryItem::create(
            NewInventoryItem {
                warehouse_id,
                name: "Steel shelf".to_string(),
                description: Some("Galvanised, 5 tiers".to_string()),
                sku: sku.to_string(),
                quantity,
                reorder_point,
                reorder_quantity: 40,
                unit_price_cents: 8_950,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn new_user(username: &str) -> User {
        User {
            id: UserId::new(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::LogisticsManager,
            created_at: Utc::now(),
        }
    }

    async fn setup() -> Fixture {
        let db = InMemoryDatabase::new();
        let source = new_warehouse("Source");
        let destination = new_warehouse("Destination");
        let user = new_user("dispatcher");

        let mut uow = db.begin().await.unwrap();
        uow.save_warehouse(&source).await.unwrap();
        uow.save_warehouse(&destination).await.unwrap();
        uow.save_user(&user).await.unwrap();
        uow.commit().await.unwrap();

        Fixture {
            coordinator: TransferCoordinator::new(db.clone()),
            db,
            source_warehouse: source.id,
            destination_warehouse: destination.id,
            user: user.id,
        }
    }

    async fn seed_item(db: &InMemoryDatabase, item: &InventoryItem) {
        let mut uow = db.begin().await.unwrap();
        uow.save_item(item).await.unwrap();
        uow.commit().await.unwrap();
    }

    async fn items_in(db: &InMemoryDatabase, warehouse_id: WarehouseId) -> Vec<InventoryItem> {
        let mut uow = db.begin().await.unwrap();
        uow.list_items(&InventoryFilter {
            warehouse_id: Some(warehouse_id),
            ..InventoryFilter::default()
        })
        .await
        .unwrap()
    }

    async fn item(db: &InMemoryDatabase, id: InventoryItemId) -> InventoryItem {
        let mut uow = db.begin().await.unwrap();
        uow.find_item(id).await.unwrap().unwrap()
    }

    async fn transfer_count(db: &InMemoryDatabase) -> usize {
        let mut uow = db.begin().await.unwrap();
        uow.list_transfers(&TransferFilter::default()).await.unwrap().len()
    }

    fn request(fx: &Fixture, source_item_id: InventoryItemId, quantity: i64) -> TransferRequest {
        TransferRequest {
            source_item_id,
            destination_warehouse_id: fx.destination_warehouse,
            quantity,
            initiated_by: fx.user,
        }
    }

    #[tokio::test]
    async fn transfer_into_warehouse_without_sku_creates_item() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 100, 20);
        seed_item(&fx.db, &source).await;

        let record = fx.coordinator.transfer(request(&fx, source.id_typed(), 30)).await.unwrap();

        let source_after = item(&fx.db, source.id_typed()).await;
        assert_eq!(source_after.quantity(), 70);
        assert!(!source_after.needs_restock());

        let created = items_in(&fx.db, fx.destination_warehouse).await;
        assert_eq!(created.len(), 1);
        let created = &created[0];
        assert_eq!(created.quantity(), 30);
        assert_eq!(created.sku(), source.sku());
        assert_eq!(created.name(), source.name());
        assert_eq!(created.description(), source.description());
        assert_eq!(created.reorder_point(), source.reorder_point());
        assert_eq!(created.reorder_quantity(), source.reorder_quantity());
        assert_eq!(created.unit_price_cents(), source.unit_price_cents());

        assert_eq!(record.status, TransferStatus::Completed);
        assert_eq!(record.source_warehouse_id, fx.source_warehouse);
        assert_eq!(record.destination_warehouse_id, fx.destination_warehouse);
        assert_eq!(record.inventory_item_id, source.id_typed());
        assert_eq!(record.quantity, 30);
        assert_eq!(record.initiated_by, fx.user);
        let completed_at = record.completed_at.expect("completed_at set");
        assert!(completed_at >= record.created_at);

        let mut uow = fx.db.begin().await.unwrap();
        let stored = uow.find_transfer(record.id).await.unwrap();
        assert_eq!(stored, Some(record));
        assert_eq!(uow.list_transfers(&TransferFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transfer_into_warehouse_with_sku_merges() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 50, 5);
        let existing = new_item(fx.destination_warehouse, "SHELF-5", 12, 5);
        seed_item(&fx.db, &source).await;
        seed_item(&fx.db, &existing).await;

        fx.coordinator.transfer(request(&fx, source.id_typed(), 8)).await.unwrap();

        let destination_items = items_in(&fx.db, fx.destination_warehouse).await;
        assert_eq!(destination_items.len(), 1);
        assert_eq!(destination_items[0].id_typed(), existing.id_typed());
        assert_eq!(destination_items[0].quantity(), 20);
        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 42);
    }

    #[tokio::test]
    async fn transfer_of_more_than_available_changes_nothing() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 10, 2);
        seed_item(&fx.db, &source).await;

        let err = fx
            .coordinator
            .transfer(request(&fx, source.id_typed(), 15))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransferError::InsufficientQuantity {
                item_id: source.id_typed(),
                available: 10,
                requested: 15,
            }
        );
        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 10);
        assert!(items_in(&fx.db, fx.destination_warehouse).await.is_empty());
        assert_eq!(transfer_count(&fx.db).await, 0);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected_before_any_lookup() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 10, 2);
        seed_item(&fx.db, &source).await;
        let begins = fx.db.begin_count();

        for quantity in [0, -1, i64::MIN] {
            let err = fx
                .coordinator
                .transfer(request(&fx, source.id_typed(), quantity))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                TransferError::InvalidArgument("transfer quantity must be positive".to_string())
            );
        }
        assert_eq!(fx.db.begin_count(), begins);
    }

    #[tokio::test]
    async fn missing_entities_are_reported_by_kind() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 10, 2);
        seed_item(&fx.db, &source).await;

        let err = fx
            .coordinator
            .transfer(request(&fx, InventoryItemId::new(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotFound { entity: EntityKind::InventoryItem, .. }));

        let err = fx
            .coordinator
            .transfer(TransferRequest {
                destination_warehouse_id: WarehouseId::new(),
                ..request(&fx, source.id_typed(), 1)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::NotFound { entity: EntityKind::Warehouse, .. }));

        let ghost = UserId::new();
        let err = fx
            .coordinator
            .transfer(TransferRequest {
                initiated_by: ghost,
                ..request(&fx, source.id_typed(), 1)
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransferError::NotFound {
                entity: EntityKind::User,
                id: ghost.to_string(),
            }
        );

        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 10);
        assert_eq!(transfer_count(&fx.db).await, 0);
    }

    #[tokio::test]
    async fn quantity_is_checked_before_destination_lookup() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 3, 0);
        seed_item(&fx.db, &source).await;

        let err = fx
            .coordinator
            .transfer(TransferRequest {
                destination_warehouse_id: WarehouseId::new(),
                ..request(&fx, source.id_typed(), 4)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientQuantity { .. }));
    }

    #[tokio::test]
    async fn transfer_within_one_warehouse_merges_back_into_the_source() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 10, 2);
        seed_item(&fx.db, &source).await;

        let record = fx
            .coordinator
            .transfer(TransferRequest {
                destination_warehouse_id: fx.source_warehouse,
                ..request(&fx, source.id_typed(), 5)
            })
            .await
            .unwrap();

        assert_eq!(record.status, TransferStatus::Completed);
        assert_eq!(record.source_warehouse_id, record.destination_warehouse_id);
        let items = items_in(&fx.db, fx.source_warehouse).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id_typed(), source.id_typed());
        assert_eq!(items[0].quantity(), 10);
        assert_eq!(transfer_count(&fx.db).await, 1);
    }

    #[tokio::test]
    async fn failed_write_mid_transfer_rolls_everything_back() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 100, 20);
        seed_item(&fx.db, &source).await;

        // Record and source decrement succeed, destination write fails.
        fx.db.fail_writes_after(2);
        let err = fx
            .coordinator
            .transfer(request(&fx, source.id_typed(), 30))
            .await
            .unwrap_err();
        fx.db.clear_faults();

        assert!(matches!(err, TransferError::Storage(StoreError::Backend(_))));
        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 100);
        assert!(items_in(&fx.db, fx.destination_warehouse).await.is_empty());
        assert_eq!(transfer_count(&fx.db).await, 0);
    }

    /// Store write as seen by [`RecordingDatabase`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Write {
        Transfer(TransferStatus),
        Item { warehouse_id: WarehouseId, quantity: i64 },
    }

    /// Wraps the in-memory backend and logs every item and transfer write
    /// in the order it reaches the store.
    #[derive(Debug, Clone)]
    struct RecordingDatabase {
        inner: InMemoryDatabase,
        writes: Arc<Mutex<Vec<Write>>>,
    }

    #[derive(Debug)]
    struct RecordingTx {
        inner: InMemoryTx,
        writes: Arc<Mutex<Vec<Write>>>,
    }

    impl RecordingTx {
        fn log(&self, write: Write) {
            self.writes.lock().unwrap().push(write);
        }
    }

    #[async_trait]
    impl Database for RecordingDatabase {
        type Tx = RecordingTx;

        async fn begin(&self) -> StoreResult<Self::Tx> {
            Ok(RecordingTx {
                inner: self.inner.begin().await?,
                writes: self.writes.clone(),
            })
        }
    }

    #[async_trait]
    impl InventoryStore for RecordingTx {
        async fn find_item(&mut self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
            self.inner.find_item(id).await
        }

        async fn find_item_by_sku(
            &mut self,
            sku: &Sku,
            warehouse_id: WarehouseId,
        ) -> StoreResult<Option<InventoryItem>> {
            self.inner.find_item_by_sku(sku, warehouse_id).await
        }

        async fn list_items(&mut self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
            self.inner.list_items(filter).await
        }

        async fn save_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
            self.log(Write::Item {
                warehouse_id: item.warehouse_id(),
                quantity: item.quantity(),
            });
            self.inner.save_item(item).await
        }

        async fn delete_item(&mut self, id: InventoryItemId) -> StoreResult<bool> {
            self.inner.delete_item(id).await
        }
    }

    #[async_trait]
    impl WarehouseStore for RecordingTx {
        async fn find_warehouse(&mut self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
            self.inner.find_warehouse(id).await
        }

        async fn list_warehouses(&mut self, filter: &WarehouseFilter) -> StoreResult<Vec<Warehouse>> {
            self.inner.list_warehouses(filter).await
        }

        async fn save_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()> {
            self.inner.save_warehouse(warehouse).await
        }
    }

    #[async_trait]
    impl UserStore for RecordingTx {
        async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
            self.inner.find_user(id).await
        }

        async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_username(username).await
        }

        async fn save_user(&mut self, user: &User) -> StoreResult<()> {
            self.inner.save_user(user).await
        }
    }

    #[async_trait]
    impl TransferStore for RecordingTx {
        async fn find_transfer(&mut self, id: TransferId) -> StoreResult<Option<TransferRecord>> {
            self.inner.find_transfer(id).await
        }

        async fn list_transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<TransferRecord>> {
            self.inner.list_transfers(filter).await
        }

        async fn save_transfer(&mut self, record: &TransferRecord) -> StoreResult<()> {
            self.log(Write::Transfer(record.status));
            self.inner.save_transfer(record).await
        }
    }

    #[async_trait]
    impl UnitOfWork for RecordingTx {
        async fn commit(self) -> StoreResult<()> {
            self.inner.commit().await
        }

        async fn rollback(self) -> StoreResult<()> {
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn in_transit_record_is_written_before_any_stock_moves() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 100, 20);
        seed_item(&fx.db, &source).await;

        let recording = RecordingDatabase {
            inner: fx.db.clone(),
            writes: Arc::new(Mutex::new(Vec::new())),
        };
        TransferCoordinator::new(recording.clone())
            .transfer(request(&fx, source.id_typed(), 30))
            .await
            .unwrap();

        let writes = recording.writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            vec![
                Write::Transfer(TransferStatus::InTransit),
                Write::Item {
                    warehouse_id: fx.source_warehouse,
                    quantity: 70,
                },
                Write::Item {
                    warehouse_id: fx.destination_warehouse,
                    quantity: 30,
                },
                Write::Transfer(TransferStatus::Completed),
            ]
        );
    }

    #[tokio::test]
    async fn identical_requests_perform_independent_transfers() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 25, 0);
        seed_item(&fx.db, &source).await;

        let first = fx.coordinator.transfer(request(&fx, source.id_typed(), 10)).await.unwrap();
        let second = fx.coordinator.transfer(request(&fx, source.id_typed(), 10)).await.unwrap();
        let third = fx.coordinator.transfer(request(&fx, source.id_typed(), 10)).await;

        assert_ne!(first.id, second.id);
        assert!(matches!(
            third,
            Err(TransferError::InsufficientQuantity { available: 5, requested: 10, .. })
        ));
        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 5);
        assert_eq!(items_in(&fx.db, fx.destination_warehouse).await[0].quantity(), 20);
        assert_eq!(transfer_count(&fx.db).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_never_oversell_or_duplicate() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 100, 0);
        seed_item(&fx.db, &source).await;
        let coordinator = Arc::new(fx.coordinator.clone());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let coordinator = coordinator.clone();
            let req = request(&fx, source.id_typed(), 10);
            handles.push(tokio::spawn(async move { coordinator.transfer(req).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(TransferError::InsufficientQuantity { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(item(&fx.db, source.id_typed()).await.quantity(), 0);
        let destination = items_in(&fx.db, fx.destination_warehouse).await;
        assert_eq!(destination.len(), 1, "merge-or-create must not duplicate the SKU");
        assert_eq!(destination[0].quantity(), 100);
        assert_eq!(transfer_count(&fx.db).await, 10);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: quantity is conserved across source and destination for
        /// any sequence of transfer attempts, and the source never goes negative.
        #[test]
        fn transfers_conserve_quantity(
            start in 0i64..500,
            amounts in proptest::collection::vec(-5i64..120, 1..12),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let fx = setup().await;
                let source = new_item(fx.source_warehouse, "SHELF-5", start, 0);
                seed_item(&fx.db, &source).await;

                let mut expected_source = start;
                let mut completed = 0;
                for amount in amounts {
                    let result = fx.coordinator.transfer(request(&fx, source.id_typed(), amount)).await;
                    if amount > 0 && amount <= expected_source {
                        prop_assert!(result.is_ok());
                        expected_source -= amount;
                        completed += 1;
                    } else {
                        prop_assert!(result.is_err());
                    }
                }

                let source_qty = item(&fx.db, source.id_typed()).await.quantity();
                let destination_qty: i64 = items_in(&fx.db, fx.destination_warehouse)
                    .await
                    .iter()
                    .map(|i| i.quantity())
                    .sum();
                prop_assert_eq!(source_qty, expected_source);
                prop_assert!(source_qty >= 0);
                prop_assert_eq!(source_qty + destination_qty, start);
                prop_assert_eq!(transfer_count(&fx.db).await, completed);
                Ok(())
            })?;
        }
    }

    // Services

    fn warehouse_input(name: &str) -> NewWarehouse {
        NewWarehouse {
            name: name.to_string(),
            location: "Antwerp".to_string(),
            capacity: None,
            manager_id: None,
            contact: ContactInfo {
                phone: Some("+32 3 000 00 00".to_string()),
                email: None,
            },
        }
    }

    fn item_input(warehouse_id: WarehouseId, sku: &str, quantity: i64) -> NewInventoryItem {
        NewInventoryItem {
            warehouse_id,
            name: "Cable reel".to_string(),
            description: None,
            sku: sku.to_string(),
            quantity,
            reorder_point: 10,
            reorder_quantity: 25,
            unit_price_cents: 1_500,
        }
    }

    #[tokio::test]
    async fn warehouse_lifecycle() {
        let fx = setup().await;
        let service = WarehouseService::new(fx.db.clone());

        let err = service
            .create(NewWarehouse {
                manager_id: Some(UserId::new()),
                ..warehouse_input("Managed")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        let created = service
            .create(NewWarehouse {
                manager_id: Some(fx.user),
                ..warehouse_input("Managed")
            })
            .await
            .unwrap();
        assert_eq!(created.capacity, 0);

        let updated = service
            .update(
                created.id,
                NewWarehouse {
                    capacity: Some(750),
                    manager_id: Some(fx.user),
                    ..warehouse_input("Managed East")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.capacity, 750);
        assert_eq!(service.by_manager(fx.user).await.unwrap(), vec![updated.clone()]);
        let err = service.by_manager(UserId::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        service.deactivate(created.id).await.unwrap();
        let fetched = service.get(created.id).await.unwrap();
        assert!(!fetched.active);

        let active = service
            .list(WarehouseFilter {
                active: Some(true),
                ..WarehouseFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|w| w.id != created.id));
    }

    #[tokio::test]
    async fn inventory_crud_enforces_sku_uniqueness_per_warehouse() {
        let fx = setup().await;
        let service = InventoryService::new(fx.db.clone());

        let first = service
            .create_item(item_input(fx.source_warehouse, "REEL-1", 40))
            .await
            .unwrap();
        let err = service
            .create_item(item_input(fx.source_warehouse, "REEL-1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        // Same SKU elsewhere is fine.
        let other = service
            .create_item(item_input(fx.destination_warehouse, "REEL-1", 5))
            .await
            .unwrap();

        let err = service
            .update_item(other.id_typed(), item_input(fx.source_warehouse, "REEL-1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        let renamed = service
            .update_item(first.id_typed(), item_input(fx.source_warehouse, "REEL-2", 40))
            .await
            .unwrap();
        assert_eq!(renamed.sku().as_str(), "REEL-2");

        let err = service
            .create_item(item_input(WarehouseId::new(), "REEL-3", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));

        service.delete_item(other.id_typed()).await.unwrap();
        let err = service.delete_item(other.id_typed()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn quantity_adjustment_and_low_stock() {
        let fx = setup().await;
        let service = InventoryService::new(fx.db.clone());
        let item = service
            .create_item(item_input(fx.source_warehouse, "REEL-1", 12))
            .await
            .unwrap();
        service
            .create_item(item_input(fx.destination_warehouse, "REEL-9", 500))
            .await
            .unwrap();

        assert!(service.low_stock(None).await.unwrap().is_empty());

        let adjusted = service.adjust_quantity(item.id_typed(), -2).await.unwrap();
        assert_eq!(adjusted.quantity(), 10);
        assert!(adjusted.needs_restock());

        let err = service.adjust_quantity(item.id_typed(), -11).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InvariantViolation(_))));

        let low = service.low_stock(Some(fx.source_warehouse)).await.unwrap();
        assert_eq!(low.len(), 1);
        assert!(service.low_stock(Some(fx.destination_warehouse)).await.unwrap().is_empty());

        let err = service.low_stock(Some(WarehouseId::new())).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn transfer_history_filters_by_route_and_status() {
        let fx = setup().await;
        let source = new_item(fx.source_warehouse, "SHELF-5", 30, 0);
        seed_item(&fx.db, &source).await;
        fx.coordinator.transfer(request(&fx, source.id_typed(), 5)).await.unwrap();
        fx.coordinator.transfer(request(&fx, source.id_typed(), 5)).await.unwrap();

        let history = TransferHistoryService::new(fx.db.clone());
        let outbound = history
            .list(TransferFilter {
                source_warehouse_id: Some(fx.source_warehouse),
                status: Some(TransferStatus::Completed),
                ..TransferFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(outbound.len(), 2);
        assert!(outbound[0].created_at >= outbound[1].created_at);

        let inbound_to_source = history
            .list(TransferFilter {
                destination_warehouse_id: Some(fx.source_warehouse),
                ..TransferFilter::default()
            })
            .await
            .unwrap();
        assert!(inbound_to_source.is_empty());
    }
}
