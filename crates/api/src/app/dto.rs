use core::str::FromStr;

use serde::Deserialize;
use serde_json::json;

use stockroute_core::{DomainError, UserId, WarehouseId};
use stockroute_inventory::{
    ContactInfo, InventoryItem, NewInventoryItem, NewWarehouse, TransferRecord, TransferStatus,
    Warehouse,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to `warehouse_staff`.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseRequest {
    pub name: String,
    pub location: String,
    pub capacity: Option<u64>,
    pub manager_id: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryItemRequest {
    pub warehouse_id: String,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub quantity: i64,
    #[serde(default)]
    pub reorder_point: i64,
    #[serde(default)]
    pub reorder_quantity: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct QuantityAdjustmentRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferInventoryRequest {
    pub source_item_id: String,
    pub destination_warehouse_id: String,
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct WarehouseQuery {
    pub active: Option<bool>,
    pub manager_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub warehouse_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct LowStockQuery {
    pub warehouse_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    pub source_warehouse_id: Option<String>,
    pub destination_warehouse_id: Option<String>,
    pub status: Option<String>,
}

// -------------------------
// Request → domain mapping
// -------------------------

/// Parse a path/body identifier, answering 400 on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.trim().parse::<T>().map_err(errors::domain_error_to_response)
}

pub fn parse_optional_id<T>(raw: Option<&str>) -> Result<Option<T>, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.map(parse_id::<T>).transpose()
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<TransferStatus>, axum::response::Response> {
    raw.map(|s| s.parse::<TransferStatus>().map_err(errors::domain_error_to_response))
        .transpose()
}

impl WarehouseRequest {
    pub fn into_domain(self) -> Result<NewWarehouse, axum::response::Response> {
        Ok(NewWarehouse {
            manager_id: parse_optional_id::<UserId>(self.manager_id.as_deref())?,
            name: self.name,
            location: self.location,
            capacity: self.capacity,
            contact: ContactInfo {
                phone: self.contact_phone,
                email: self.contact_email,
            },
        })
    }
}

impl InventoryItemRequest {
    pub fn into_domain(self) -> Result<NewInventoryItem, axum::response::Response> {
        Ok(NewInventoryItem {
            warehouse_id: parse_id::<WarehouseId>(&self.warehouse_id)?,
            name: self.name,
            description: self.description,
            sku: self.sku,
            quantity: self.quantity,
            reorder_point: self.reorder_point,
            reorder_quantity: self.reorder_quantity,
            unit_price_cents: self.unit_price_cents,
        })
    }
}

// -------------------------
// Domain → JSON mapping
// -------------------------

pub fn warehouse_to_json(w: &Warehouse) -> serde_json::Value {
    json!({
        "id": w.id.to_string(),
        "name": w.name,
        "location": w.location,
        "capacity": w.capacity,
        "manager_id": w.manager_id.map(|m| m.to_string()),
        "active": w.active,
        "contact_phone": w.contact.phone,
        "contact_email": w.contact.email,
    })
}

pub fn item_to_json(item: &InventoryItem) -> serde_json::Value {
    json!({
        "id": item.id_typed().to_string(),
        "warehouse_id": item.warehouse_id().to_string(),
        "name": item.name(),
        "description": item.description(),
        "sku": item.sku().as_str(),
        "quantity": item.quantity(),
        "reorder_point": item.reorder_point(),
        "reorder_quantity": item.reorder_quantity(),
        "unit_price_cents": item.unit_price_cents(),
        "needs_restock": item.needs_restock(),
        "updated_at": item.updated_at().to_rfc3339(),
    })
}

pub fn transfer_to_json(t: &TransferRecord) -> serde_json::Value {
    json!({
        "id": t.id.to_string(),
        "source_warehouse_id": t.source_warehouse_id.to_string(),
        "destination_warehouse_id": t.destination_warehouse_id.to_string(),
        "inventory_item_id": t.inventory_item_id.to_string(),
        "quantity": t.quantity,
        "status": t.status.as_str(),
        "initiated_by": t.initiated_by.to_string(),
        "created_at": t.created_at.to_rfc3339(),
        "completed_at": t.completed_at.map(|c| c.to_rfc3339()),
    })
}
