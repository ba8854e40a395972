use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockroute_auth::Permission;
use stockroute_core::{UserId, WarehouseId};
use stockroute_inventory::{InventoryFilter, WarehouseFilter};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route(
            "/:id",
            get(get_warehouse).put(update_warehouse).delete(delete_warehouse),
        )
        .route("/:id/inventory", get(list_warehouse_inventory))
}

pub async fn list_warehouses(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::WarehouseQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::WAREHOUSES_READ) {
        return resp;
    }

    let manager_id = match dto::parse_optional_id::<UserId>(query.manager_id.as_deref()) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filter = WarehouseFilter {
        manager_id,
        active: query.active,
    };

    match services.warehouses.list(filter).await {
        Ok(list) => Json(list.iter().map(dto::warehouse_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<dto::WarehouseRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::WAREHOUSES_WRITE) {
        return resp;
    }

    let input = match body.into_domain() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.warehouses.create(input).await {
        Ok(w) => (StatusCode::CREATED, Json(dto::warehouse_to_json(&w))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::WAREHOUSES_READ) {
        return resp;
    }
    let id: WarehouseId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.warehouses.get(id).await {
        Ok(w) => Json(dto::warehouse_to_json(&w)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::WarehouseRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::WAREHOUSES_WRITE) {
        return resp;
    }
    let id: WarehouseId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input = match body.into_domain() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.warehouses.update(id, input).await {
        Ok(w) => Json(dto::warehouse_to_json(&w)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Soft delete.
pub async fn delete_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::WAREHOUSES_WRITE) {
        return resp;
    }
    let id: WarehouseId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.warehouses.deactivate(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_warehouse_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::INVENTORY_READ) {
        return resp;
    }
    let id: WarehouseId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // 404 for unknown warehouses rather than an empty list.
    if let Err(e) = services.warehouses.get(id).await {
        return errors::service_error_to_response(e);
    }

    let filter = InventoryFilter {
        warehouse_id: Some(id),
        ..InventoryFilter::default()
    };
    match services.inventory.list_items(filter).await {
        Ok(items) => Json(items.iter().map(dto::item_to_json).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
