//! Postgres storage backend.
//!
//! Every unit of work is a `SERIALIZABLE` transaction, and item reads inside
//! it take row locks (`SELECT ... FOR UPDATE`), so two transfers touching the
//! same source item or destination SKU are ordered by the database.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` | `Duplicate` | SKU already stocked in the warehouse, username/email taken |
//! | `40001` | `Conflict` | Serialization failure between concurrent units of work |
//! | `40P01` | `Conflict` | Deadlock detected |
//! | Any other | `Backend` | Constraint, connection or protocol failures |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use stockroute_auth::{Role, User};
use stockroute_core::{InventoryItemId, TransferId, UserId, WarehouseId};
use stockroute_inventory::{
    ContactInfo, Database, InventoryFilter, InventoryItem, InventoryStore, NewInventoryItem, Sku,
    StoreError, StoreResult, TransferFilter, TransferRecord, TransferStatus, TransferStore,
    UnitOfWork, UserStore, Warehouse, WarehouseFilter, WarehouseStore,
};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

const ITEM_COLUMNS: &str = "id, warehouse_id, name, description, sku, quantity, reorder_point, \
                            reorder_quantity, unit_price_cents, updated_at";
const WAREHOUSE_COLUMNS: &str =
    "id, name, location, capacity, manager_id, active, contact_phone, contact_email";
const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";
const TRANSFER_COLUMNS: &str = "id, source_warehouse_id, destination_warehouse_id, \
                                inventory_item_id, quantity, status, initiated_by, created_at, \
                                completed_at";

/// Pooled Postgres connection handle. Clones share the pool.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        info!("database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<Self::Tx> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;
        Ok(PgTx { tx })
    }
}

/// One `SERIALIZABLE` transaction. Dropping it rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl core::fmt::Debug for PgTx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgTx").finish_non_exhaustive()
    }
}

#[async_trait]
impl InventoryStore for PgTx {
    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn find_item(&mut self, id: InventoryItemId) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_item", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    #[instrument(skip(self), fields(sku = %sku, warehouse_id = %warehouse_id), err)]
    async fn find_item_by_sku(
        &mut self,
        sku: &Sku,
        warehouse_id: WarehouseId,
    ) -> StoreResult<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE warehouse_id = $1 AND sku = $2 FOR UPDATE"
        ))
        .bind(warehouse_id.as_uuid())
        .bind(sku.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_item_by_sku", e))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&mut self, filter: &InventoryFilter) -> StoreResult<Vec<InventoryItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE ($1::uuid IS NULL OR warehouse_id = $1) \
               AND (NOT $2 OR quantity <= reorder_point) \
               AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%') \
             ORDER BY id"
        ))
        .bind(filter.warehouse_id.map(|w| *w.as_uuid()))
        .bind(filter.needs_restock)
        .bind(filter.name_contains.as_deref())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;

        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self, item), fields(item_id = %item.id_typed(), quantity = item.quantity()), err)]
    async fn save_item(&mut self, item: &InventoryItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, warehouse_id, name, description, sku, quantity,
                reorder_point, reorder_quantity, unit_price_cents, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                warehouse_id = EXCLUDED.warehouse_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                sku = EXCLUDED.sku,
                quantity = EXCLUDED.quantity,
                reorder_point = EXCLUDED.reorder_point,
                reorder_quantity = EXCLUDED.reorder_quantity,
                unit_price_cents = EXCLUDED.unit_price_cents,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(item.id_typed().as_uuid())
        .bind(item.warehouse_id().as_uuid())
        .bind(item.name())
        .bind(item.description())
        .bind(item.sku().as_str())
        .bind(item.quantity())
        .bind(item.reorder_point())
        .bind(item.reorder_quantity())
        .bind(item.unit_price_cents())
        .bind(item.updated_at())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_item", e))?;
        Ok(())
    }

    async fn delete_item(&mut self, id: InventoryItemId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WarehouseStore for PgTx {
    async fn find_warehouse(&mut self, id: WarehouseId) -> StoreResult<Option<Warehouse>> {
        let row = sqlx::query(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_warehouse", e))?;

        row.as_ref().map(warehouse_from_row).transpose()
    }

    async fn list_warehouses(&mut self, filter: &WarehouseFilter) -> StoreResult<Vec<Warehouse>> {
        let rows = sqlx::query(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses \
             WHERE ($1::uuid IS NULL OR manager_id = $1) \
               AND ($2::boolean IS NULL OR active = $2) \
             ORDER BY id"
        ))
        .bind(filter.manager_id.map(|m| *m.as_uuid()))
        .bind(filter.active)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_warehouses", e))?;

        rows.iter().map(warehouse_from_row).collect()
    }

    #[instrument(skip(self, warehouse), fields(warehouse_id = %warehouse.id), err)]
    async fn save_warehouse(&mut self, warehouse: &Warehouse) -> StoreResult<()> {
        let capacity = i64::try_from(warehouse.capacity)
            .map_err(|_| StoreError::Backend("warehouse capacity out of range".to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO warehouses (
                id, name, location, capacity, manager_id, active, contact_phone, contact_email
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                location = EXCLUDED.location,
                capacity = EXCLUDED.capacity,
                manager_id = EXCLUDED.manager_id,
                active = EXCLUDED.active,
                contact_phone = EXCLUDED.contact_phone,
                contact_email = EXCLUDED.contact_email
            "#,
        )
        .bind(warehouse.id.as_uuid())
        .bind(&warehouse.name)
        .bind(&warehouse.location)
        .bind(capacity)
        .bind(warehouse.manager_id.map(|m| *m.as_uuid()))
        .bind(warehouse.active)
        .bind(warehouse.contact.phone.as_deref())
        .bind(warehouse.contact.email.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_warehouse", e))?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgTx {
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_username", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_user", e))?;
        Ok(())
    }
}

#[async_trait]
impl TransferStore for PgTx {
    async fn find_transfer(&mut self, id: TransferId) -> StoreResult<Option<TransferRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_transfer", e))?;

        row.as_ref().map(transfer_from_row).transpose()
    }

    async fn list_transfers(&mut self, filter: &TransferFilter) -> StoreResult<Vec<TransferRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers \
             WHERE ($1::uuid IS NULL OR source_warehouse_id = $1) \
               AND ($2::uuid IS NULL OR destination_warehouse_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.source_warehouse_id.map(|w| *w.as_uuid()))
        .bind(filter.destination_warehouse_id.map(|w| *w.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_transfers", e))?;

        rows.iter().map(transfer_from_row).collect()
    }

    #[instrument(skip(self, record), fields(transfer_id = %record.id, status = %record.status), err)]
    async fn save_transfer(&mut self, record: &TransferRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, source_warehouse_id, destination_warehouse_id, inventory_item_id,
                quantity, status, initiated_by, created_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.source_warehouse_id.as_uuid())
        .bind(record.destination_warehouse_id.as_uuid())
        .bind(record.inventory_item_id.as_uuid())
        .bind(record.quantity)
        .bind(record.status.as_str())
        .bind(record.initiated_by.as_uuid())
        .bind(record.created_at)
        .bind(record.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_transfer", e))?;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgTx {
    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

// Row decoding

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column {name}: {e}")))
}

fn corrupt(what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Backend(format!("stored {what} row is invalid: {err}"))
}

fn item_from_row(row: &PgRow) -> StoreResult<InventoryItem> {
    let id: Uuid = column(row, "id")?;
    let warehouse_id: Uuid = column(row, "warehouse_id")?;
    let updated_at: DateTime<Utc> = column(row, "updated_at")?;
    let input = NewInventoryItem {
        warehouse_id: WarehouseId::from_uuid(warehouse_id),
        name: column(row, "name")?,
        description: column(row, "description")?,
        sku: column(row, "sku")?,
        quantity: column(row, "quantity")?,
        reorder_point: column(row, "reorder_point")?,
        reorder_quantity: column(row, "reorder_quantity")?,
        unit_price_cents: column(row, "unit_price_cents")?,
    };
    InventoryItem::restore(InventoryItemId::from_uuid(id), input, updated_at)
        .map_err(|e| corrupt("inventory item", e))
}

fn warehouse_from_row(row: &PgRow) -> StoreResult<Warehouse> {
    let id: Uuid = column(row, "id")?;
    let capacity: i64 = column(row, "capacity")?;
    let manager_id: Option<Uuid> = column(row, "manager_id")?;
    Ok(Warehouse {
        id: WarehouseId::from_uuid(id),
        name: column(row, "name")?,
        location: column(row, "location")?,
        capacity: u64::try_from(capacity).map_err(|e| corrupt("warehouse", e))?,
        manager_id: manager_id.map(UserId::from_uuid),
        active: column(row, "active")?,
        contact: ContactInfo {
            phone: column(row, "contact_phone")?,
            email: column(row, "contact_email")?,
        },
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let id: Uuid = column(row, "id")?;
    let role: String = column(row, "role")?;
    Ok(User {
        id: UserId::from_uuid(id),
        username: column(row, "username")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        role: role.parse::<Role>().map_err(|e| corrupt("user", e))?,
        created_at: column(row, "created_at")?,
    })
}

fn transfer_from_row(row: &PgRow) -> StoreResult<TransferRecord> {
    let id: Uuid = column(row, "id")?;
    let source: Uuid = column(row, "source_warehouse_id")?;
    let destination: Uuid = column(row, "destination_warehouse_id")?;
    let item: Uuid = column(row, "inventory_item_id")?;
    let initiated_by: Uuid = column(row, "initiated_by")?;
    let status: String = column(row, "status")?;
    Ok(TransferRecord {
        id: TransferId::from_uuid(id),
        source_warehouse_id: WarehouseId::from_uuid(source),
        destination_warehouse_id: WarehouseId::from_uuid(destination),
        inventory_item_id: InventoryItemId::from_uuid(item),
        quantity: column(row, "quantity")?,
        status: status
            .parse::<TransferStatus>()
            .map_err(|e| corrupt("transfer", e))?,
        initiated_by: UserId::from_uuid(initiated_by),
        created_at: column(row, "created_at")?,
        completed_at: column(row, "completed_at")?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
