use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use stockroute_core::DomainError;
use stockroute_inventory::{ServiceError, StoreError, TransferError};

use crate::app::accounts::AccountError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Duplicate(msg) => json_error(StatusCode::CONFLICT, "duplicate", msg),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Backend(msg) => {
            error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "storage failure")
        }
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Storage(e) => store_error_to_response(e),
    }
}

pub fn transfer_error_to_response(err: TransferError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        TransferError::InvalidArgument(_) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_argument", message)
        }
        TransferError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        TransferError::InsufficientQuantity { .. } => {
            json_error(StatusCode::CONFLICT, "insufficient_quantity", message)
        }
        TransferError::Storage(e) => store_error_to_response(e),
    }
}

pub fn account_error_to_response(err: AccountError) -> axum::response::Response {
    match err {
        AccountError::Domain(e) => domain_error_to_response(e),
        AccountError::Storage(e) => store_error_to_response(e),
        AccountError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        AccountError::Hash(e) => {
            error!(error = %e, "credential hashing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
        AccountError::Token(e) => {
            error!(error = %e, "token issuance failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
        AccountError::Worker(e) => {
            error!(error = %e, "credential worker failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}
