use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use stockroute_auth::Permission;
use stockroute_core::{InventoryItemId, WarehouseId};
use stockroute_inventory::{InventoryFilter, TransferRequest};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/low-stock", get(low_stock))
        .route("/transfer", post(transfer_inventory))
        .route("/:id", get(get_item).put(update_item).delete(delete_item))
        .route("/:id/quantity", patch(adjust_quantity))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::InventoryQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return resp;
    }
    let warehouse_id = match dto::parse_optional_id::<WarehouseId>(query.warehouse_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let filter = InventoryFilter {
        warehouse_id,
        needs_restock: query.low_stock,
        name_contains: query.name.filter(|n| !n.trim().is_empty()),
    };
    match services.inventory.list_items(filter).await {
        Ok(items) => Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::InventoryItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let input = match body.into_domain() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.create_item(input).await {
        Ok(item) => (StatusCode::CREATED, Json(dto::item_to_json(&item))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return resp;
    }
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.get_item(id).await {
        Ok(item) => Json(dto::item_to_json(&item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::InventoryItemRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match body.into_domain() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.update_item(id, input).await {
        Ok(item) => Json(dto::item_to_json(&item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.delete_item(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::QuantityAdjustmentRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_WRITE) {
        return resp;
    }
    let id: InventoryItemId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.adjust_quantity(id, body.delta).await {
        Ok(item) => Json(dto::item_to_json(&item)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::LowStockQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return resp;
    }
    let warehouse_id = match dto::parse_optional_id::<WarehouseId>(query.warehouse_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.inventory.low_stock(warehouse_id).await {
        Ok(items) => Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Move stock to another warehouse on behalf of the caller.
pub async fn transfer_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::TransferInventoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_TRANSFER) {
        return resp;
    }
    let source_item_id: InventoryItemId = match dto::parse_id(&body.source_item_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let destination_warehouse_id: WarehouseId = match dto::parse_id(&body.destination_warehouse_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let request = TransferRequest {
        source_item_id,
        destination_warehouse_id,
        quantity: body.quantity,
        initiated_by: principal.user_id(),
    };

    match services.transfers.transfer(request).await {
        Ok(record) => (StatusCode::CREATED, Json(dto::transfer_to_json(&record))).into_response(),
        Err(e) => errors::transfer_error_to_response(e),
    }
}
