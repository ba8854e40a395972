use axum::{Router, routing::get};

pub mod auth;
pub mod inventory;
pub mod system;
pub mod transfers;
pub mod warehouses;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/api/warehouses", warehouses::router())
        .nest("/api/inventory", inventory::router())
        .nest("/api/transfers", transfers::router())
}
