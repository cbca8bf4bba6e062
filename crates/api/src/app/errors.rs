use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use carbonledger_allowances::AllowanceError;
use carbonledger_core::DomainError;
use carbonledger_infra::LedgerError;
use carbonledger_infra::allowance_store::StoreError;
use carbonledger_infra::directory::DirectoryError;
use carbonledger_infra::factors::CatalogError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    match err {
        LedgerError::Rejected(rejection) => allowance_error_to_response(rejection),
        LedgerError::UnknownEntity(id) => json_error(
            StatusCode::NOT_FOUND,
            "unknown_entity",
            format!("entity {id} not found"),
        ),
        LedgerError::Store(StoreError::Conflict(msg)) => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("ledger is busy, retry the request: {msg}"),
        ),
        LedgerError::Store(e) => {
            tracing::error!(error = %e, "allowance store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
        LedgerError::Directory(e) => directory_error_to_response(e),
    }
}

fn allowance_error_to_response(err: AllowanceError) -> axum::response::Response {
    let (status, code) = match &err {
        AllowanceError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
        AllowanceError::InvalidDelta(_) => (StatusCode::BAD_REQUEST, "invalid_delta"),
        AllowanceError::SelfTransfer(_) => (StatusCode::BAD_REQUEST, "self_transfer"),
        AllowanceError::InsufficientBalance { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
        }
        AllowanceError::BalanceOverflow { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "balance_overflow")
        }
    };
    json_error(status, code, err.to_string())
}

pub fn directory_error_to_response(err: DirectoryError) -> axum::response::Response {
    match err {
        DirectoryError::Domain(e) => domain_error_to_response(e),
        DirectoryError::Backend(msg) => {
            tracing::error!(error = %msg, "directory store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn catalog_error_to_response(err: CatalogError) -> axum::response::Response {
    match err {
        CatalogError::Domain(e) => domain_error_to_response(e),
        CatalogError::Backend(msg) => {
            tracing::error!(error = %msg, "factor catalog failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

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

/// Malformed body or query string (missing field, wrong type).
pub fn invalid_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", message)
}
