use stockroute_infra::AnyDatabase;
use stockroute_inventory::{
    InventoryService, TransferCoordinator, TransferHistoryService, WarehouseService,
};

use crate::app::accounts::AccountService;

/// Everything a handler may call, shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub accounts: AccountService,
    pub warehouses: WarehouseService<AnyDatabase>,
    pub inventory: InventoryService<AnyDatabase>,
    pub transfers: TransferCoordinator<AnyDatabase>,
    pub transfer_history: TransferHistoryService<AnyDatabase>,
}

impl AppServices {
    pub fn new(db: AnyDatabase, accounts: AccountService) -> Self {
        Self {
            accounts,
            warehouses: WarehouseService::new(db.clone()),
            inventory: InventoryService::new(db.clone()),
            transfers: TransferCoordinator::new(db.clone()),
            transfer_history: TransferHistoryService::new(db),
        }
    }
}
