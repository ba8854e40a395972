use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use stockroute_auth::{NewUser, Role};

use crate::app::accounts::IssuedToken;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

fn token_response(status: StatusCode, issued: IssuedToken) -> axum::response::Response {
    (
        status,
        Json(serde_json::json!({
            "token": issued.token,
            "role": issued.role.as_str(),
        })),
    )
        .into_response()
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let role = match body.role.as_deref() {
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_role", e.to_string()),
        },
        None => Role::WarehouseStaff,
    };

    let input = NewUser {
        username: body.username,
        email: body.email,
        password: body.password,
        role,
    };

    match services.accounts.register(input).await {
        Ok(issued) => token_response(StatusCode::CREATED, issued),
        Err(e) => errors::account_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.accounts.login(&body.username, &body.password).await {
        Ok(issued) => token_response(StatusCode::OK, issued),
        Err(e) => errors::account_error_to_response(e),
    }
}
