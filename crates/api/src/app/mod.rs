//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage-backed services shared by every handler
//! - `accounts.rs`: registration and login
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroute_auth::{Argon2Hasher, Hs256Jwt};
use stockroute_infra::AnyDatabase;

use crate::middleware;

pub mod accounts;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(db: AnyDatabase, jwt_secret: String, token_ttl: chrono::Duration) -> Router {
    let jwt = Arc::new(Hs256Jwt::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt: jwt.clone() };

    let accounts = accounts::AccountService::new(
        db.clone(),
        Arc::new(Argon2Hasher::new()),
        jwt,
        token_ttl,
    );
    let services = Arc::new(services::AppServices::new(db, accounts));

    // Protected routes: require a valid bearer token.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/auth", routes::auth::router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
