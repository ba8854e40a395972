//! Inter-warehouse transfer workflow.
//!
//! A transfer validates its inputs, writes an `IN_TRANSIT` record, moves the
//! stock, and completes the record, all inside one unit of work. Either every
//! write lands or none does.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use stockroute_core::{DomainError, InventoryItemId, WarehouseId};

use crate::store::{Database, StoreError, UnitOfWork};
use crate::{InventoryItem, TransferRecord, TransferRequest};

/// Which kind of record a lookup failed to find.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntityKind {
    InventoryItem,
    Warehouse,
    User,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            EntityKind::InventoryItem => "inventory item",
            EntityKind::Warehouse => "warehouse",
            EntityKind::User => "user",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("insufficient quantity for item {item_id}: available {available}, requested {requested}")]
    InsufficientQuantity {
        item_id: InventoryItemId,
        available: i64,
        requested: i64,
    },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TransferError {
    fn not_found(entity: EntityKind, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for TransferError {
    fn from(err: DomainError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Where the transferred stock lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationResolution {
    /// The destination warehouse already stocks the SKU.
    Merge(InventoryItem),
    /// No item with the SKU exists there yet.
    Create,
}

/// Runs transfers against a [`Database`].
#[derive(Debug, Clone)]
pub struct TransferCoordinator<D> {
    db: D,
}

impl<D: Database> TransferCoordinator<D> {
    pub fn new(db: D) -> Self {
        Self { db }
    }

    /// Move `request.quantity` units of the source item into the destination
    /// warehouse and return the completed transfer record.
    ///
    /// Not idempotent: two identical calls perform two transfers.
    #[instrument(
        skip(self),
        fields(
            source_item_id = %request.source_item_id,
            destination_warehouse_id = %request.destination_warehouse_id,
            quantity = request.quantity,
            initiated_by = %request.initiated_by
        ),
        err
    )]
    pub async fn transfer(&self, request: TransferRequest) -> Result<TransferRecord, TransferError> {
        if request.quantity <= 0 {
            return Err(TransferError::InvalidArgument(
                "transfer quantity must be positive".to_string(),
            ));
        }

        let mut uow = self.db.begin().await?;
        let outcome = execute(&mut uow, &request).await;
        match outcome {
            Ok(record) => {
                uow.commit().await?;
                info!(transfer_id = %record.id, "transfer completed");
                Ok(record)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed transfer also failed");
                }
                Err(err)
            }
        }
    }
}

async fn execute<U: UnitOfWork>(
    uow: &mut U,
    request: &TransferRequest,
) -> Result<TransferRecord, TransferError> {
    let quantity = request.quantity;

    let mut source = uow
        .find_item(request.source_item_id)
        .await?
        .ok_or_else(|| TransferError::not_found(EntityKind::InventoryItem, request.source_item_id))?;

    if source.quantity() < quantity {
        return Err(TransferError::InsufficientQuantity {
            item_id: source.id_typed(),
            available: source.quantity(),
            requested: quantity,
        });
    }

    let destination = uow
        .find_warehouse(request.destination_warehouse_id)
        .await?
        .ok_or_else(|| {
            TransferError::not_found(EntityKind::Warehouse, request.destination_warehouse_id)
        })?;

    uow.find_user(request.initiated_by)
        .await?
        .ok_or_else(|| TransferError::not_found(EntityKind::User, request.initiated_by))?;

    let now = Utc::now();
    let mut record = TransferRecord::begin(&source, destination.id, quantity, request.initiated_by, now);
    uow.save_transfer(&record).await?;

    source.withdraw(quantity, now)?;
    uow.save_item(&source).await?;

    match resolve_destination(uow, &source, destination.id).await? {
        DestinationResolution::Merge(mut existing) => {
            existing.deposit(quantity, now)?;
            uow.save_item(&existing).await?;
        }
        DestinationResolution::Create => {
            let created = source.replicate_into(destination.id, quantity, now)?;
            uow.save_item(&created).await?;
        }
    }

    record.complete(Utc::now())?;
    uow.save_transfer(&record).await?;
    Ok(record)
}

async fn resolve_destination<U: UnitOfWork>(
    uow: &mut U,
    source: &InventoryItem,
    destination: WarehouseId,
) -> Result<DestinationResolution, TransferError> {
    Ok(match uow.find_item_by_sku(source.sku(), destination).await? {
        Some(existing) => DestinationResolution::Merge(existing),
        None => DestinationResolution::Create,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let id = InventoryItemId::new();
        let err = TransferError::not_found(EntityKind::InventoryItem, id);
        assert_eq!(err.to_string(), format!("inventory item {id} not found"));
    }

    #[test]
    fn insufficient_quantity_reports_both_amounts() {
        let err = TransferError::InsufficientQuantity {
            item_id: InventoryItemId::new(),
            available: 10,
            requested: 15,
        };
        let msg = err.to_string();
        assert!(msg.contains("available 10"));
        assert!(msg.contains("requested 15"));
    }

    #[test]
    fn domain_errors_surface_as_invalid_argument() {
        let err: TransferError = DomainError::validation("amount must be positive").into();
        assert!(matches!(err, TransferError::InvalidArgument(_)));
    }
}
