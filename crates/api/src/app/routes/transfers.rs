use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockroute_auth::Permission;
use stockroute_core::WarehouseId;
use stockroute_inventory::TransferFilter;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/", get(list_transfers))
}

pub async fn list_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::TransferQuery>,
) -> axum::response::Response {
    if let Err(resp) = authz::require(&principal, &Permission::TRANSFERS_READ) {
        return resp;
    }

    let filter = match (
        dto::parse_optional_id::<WarehouseId>(query.source_warehouse_id.as_deref()),
        dto::parse_optional_id::<WarehouseId>(query.destination_warehouse_id.as_deref()),
        dto::parse_status(query.status.as_deref()),
    ) {
        (Ok(source_warehouse_id), Ok(destination_warehouse_id), Ok(status)) => TransferFilter {
            source_warehouse_id,
            destination_warehouse_id,
            status,
        },
        (Err(resp), _, _) | (_, Err(resp), _) | (_, _, Err(resp)) => return resp,
    };

    match services.transfer_history.list(filter).await {
        Ok(records) => {
            Json(records.iter().map(dto::transfer_to_json).collect::<Vec<_>>()).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
