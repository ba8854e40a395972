use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroute_core::{DomainError, DomainResult, Entity, InventoryItemId, ValueObject, WarehouseId};

const MAX_SKU_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;

/// Stock-keeping unit.
///
/// Unique within one warehouse; equal SKUs in different warehouses denote the
/// same product, which is what transfers merge on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if trimmed.chars().count() > MAX_SKU_LEN {
            return Err(DomainError::validation(format!(
                "sku cannot exceed {MAX_SKU_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Sku {}

impl core::fmt::Display for Sku {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input for creating an inventory item, or for replacing all of its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventoryItem {
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub quantity: i64,
    pub reorder_point: i64,
    pub reorder_quantity: i64,
    pub unit_price_cents: i64,
}

/// One SKU stocked in one warehouse.
///
/// # Invariants
/// - `quantity`, `reorder_point`, `reorder_quantity` and `unit_price_cents`
///   are never negative.
/// - Belongs to exactly one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryItem {
    id: InventoryItemId,
    warehouse_id: WarehouseId,
    name: String,
    description: Option<String>,
    sku: Sku,
    quantity: i64,
    reorder_point: i64,
    reorder_quantity: i64,
    unit_price_cents: i64,
    updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Create a brand-new item with a fresh identifier.
    pub fn create(input: NewInventoryItem, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::restore(InventoryItemId::new(), input, now)
    }

    /// Rebuild an item from stored fields, re-checking every invariant.
    pub fn restore(
        id: InventoryItemId,
        input: NewInventoryItem,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = validate_name(&input.name)?;
        let sku = Sku::parse(&input.sku)?;
        ensure_non_negative("quantity", input.quantity)?;
        ensure_non_negative("reorder_point", input.reorder_point)?;
        ensure_non_negative("reorder_quantity", input.reorder_quantity)?;
        ensure_non_negative("unit_price_cents", input.unit_price_cents)?;

        Ok(Self {
            id,
            warehouse_id: input.warehouse_id,
            name,
            description: normalize_description(input.description),
            sku,
            quantity: input.quantity,
            reorder_point: input.reorder_point,
            reorder_quantity: input.reorder_quantity,
            unit_price_cents: input.unit_price_cents,
            updated_at,
        })
    }

    pub fn id_typed(&self) -> InventoryItemId {
        self.id
    }

    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reorder_point(&self) -> i64 {
        self.reorder_point
    }

    pub fn reorder_quantity(&self) -> i64 {
        self.reorder_quantity
    }

    pub fn unit_price_cents(&self) -> i64 {
        self.unit_price_cents
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Restock signal: stock is at or below the reorder point.
    pub fn needs_restock(&self) -> bool {
        self.quantity <= self.reorder_point
    }

    /// Remove `amount` units. Fails without mutating if fewer are on hand.
    pub fn withdraw(&mut self, amount: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(amount)?;
        if amount > self.quantity {
            return Err(DomainError::invariant(format!(
                "cannot withdraw {amount} units, only {} available",
                self.quantity
            )));
        }
        self.quantity -= amount;
        self.updated_at = now;
        Ok(())
    }

    /// Add `amount` units.
    pub fn deposit(&mut self, amount: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(amount)?;
        self.quantity = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        self.updated_at = now;
        Ok(())
    }

    /// Apply a signed correction (stock count, damage write-off, receipt).
    pub fn adjust_quantity(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("quantity change cannot be zero"));
        }
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        if next < 0 {
            return Err(DomainError::invariant(format!(
                "cannot reduce inventory below zero (current {}, change {delta})",
                self.quantity
            )));
        }
        self.quantity = next;
        self.updated_at = now;
        Ok(())
    }

    /// Replace every field except the identifier.
    pub fn replace_with(&mut self, input: NewInventoryItem, now: DateTime<Utc>) -> DomainResult<()> {
        *self = Self::restore(self.id, input, now)?;
        Ok(())
    }

    /// A new item for `warehouse_id` carrying this item's descriptive fields
    /// and `quantity` units.
    pub fn replicate_into(
        &self,
        warehouse_id: WarehouseId,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            id: InventoryItemId::new(),
            warehouse_id,
            name: self.name.clone(),
            description: self.description.clone(),
            sku: self.sku.clone(),
            quantity,
            reorder_point: self.reorder_point,
            reorder_quantity: self.reorder_quantity,
            unit_price_cents: self.unit_price_cents,
            updated_at: now,
        })
    }
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}

fn ensure_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}

fn ensure_positive(amount: i64) -> DomainResult<()> {
    if amount <= 0 {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(())
}
