use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroute_core::{
    DomainError, DomainResult, Entity, InventoryItemId, TransferId, UserId, WarehouseId,
};

use crate::InventoryItem;

/// Transfer lifecycle: `IN_TRANSIT` → `COMPLETED`. Nothing else.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    InTransit,
    Completed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN_TRANSIT" => Ok(TransferStatus::InTransit),
            "COMPLETED" => Ok(TransferStatus::Completed),
            other => Err(DomainError::validation(format!(
                "unknown transfer status '{other}'"
            ))),
        }
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source_item_id: InventoryItemId,
    pub destination_warehouse_id: WarehouseId,
    /// Signed so that non-positive requests can be represented and rejected.
    pub quantity: i64,
    pub initiated_by: UserId,
}

/// Audit record of a stock movement between two warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub source_warehouse_id: WarehouseId,
    pub destination_warehouse_id: WarehouseId,
    pub inventory_item_id: InventoryItemId,
    pub quantity: i64,
    pub status: TransferStatus,
    pub initiated_by: UserId,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TransferRecord {
    /// Open an `IN_TRANSIT` record for moving `quantity` of `source` out of
    /// its warehouse.
    pub fn begin(
        source: &InventoryItem,
        destination_warehouse_id: WarehouseId,
        quantity: i64,
        initiated_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransferId::new(),
            source_warehouse_id: source.warehouse_id(),
            destination_warehouse_id,
            inventory_item_id: source.id_typed(),
            quantity,
            status: TransferStatus::InTransit,
            initiated_by,
            created_at: now,
            completed_at: None,
        }
    }

    /// `IN_TRANSIT` → `COMPLETED`. The completion stamp never precedes
    /// `created_at`, even if the wall clock stepped backwards.
    pub fn complete(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != TransferStatus::InTransit {
            return Err(DomainError::invariant(format!(
                "transfer {} is already {}",
                self.id, self.status
            )));
        }
        self.status = TransferStatus::Completed;
        self.completed_at = Some(now.max(self.created_at));
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransferStatus::Completed
    }
}

impl Entity for TransferRecord {
    type Id = TransferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::NewInventoryItem;

    fn source_item() -> InventoryItem {
        InventoryItem::create(
            NewInventoryItem {
                warehouse_id: WarehouseId::new(),
                name: "Pallet jack".to_string(),
                description: None,
                sku: "PJ-9".to_string(),
                quantity: 12,
                reorder_point: 2,
                reorder_quantity: 4,
                unit_price_cents: 45_000,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn begin_derives_source_warehouse_from_item() {
        let item = source_item();
        let dest = WarehouseId::new();
        let record = TransferRecord::begin(&item, dest, 5, UserId::new(), Utc::now());

        assert_eq!(record.source_warehouse_id, item.warehouse_id());
        assert_eq!(record.destination_warehouse_id, dest);
        assert_eq!(record.inventory_item_id, item.id_typed());
        assert_eq!(record.status, TransferStatus::InTransit);
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn complete_is_a_one_way_transition() {
        let now = Utc::now();
        let mut record = TransferRecord::begin(&source_item(), WarehouseId::new(), 5, UserId::new(), now);

        record.complete(now + Duration::seconds(1)).unwrap();
        assert!(record.is_completed());

        let err = record.complete(now + Duration::seconds(2)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(record.completed_at, Some(now + Duration::seconds(1)));
    }

    #[test]
    fn completion_never_precedes_creation() {
        let now = Utc::now();
        let mut record = TransferRecord::begin(&source_item(), WarehouseId::new(), 1, UserId::new(), now);
        record.complete(now - Duration::seconds(30)).unwrap();
        assert_eq!(record.completed_at, Some(now));
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        assert_eq!("in_transit".parse::<TransferStatus>().unwrap(), TransferStatus::InTransit);
        assert_eq!(TransferStatus::Completed.to_string(), "COMPLETED");
        assert!("CANCELLED".parse::<TransferStatus>().is_err());
    }
}
