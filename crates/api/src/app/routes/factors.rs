use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
};

use carbonledger_core::DomainError;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_factors))
        .route("/gwp", get(list_gwp))
        .route("/:code", get(factor_by_code))
}

pub async fn list_factors(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.factors.list_factors().await {
        Ok(factors) => Json(factors).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn list_gwp(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.factors.list_gwp().await {
        Ok(gases) => Json(gases).into_response(),
        Err(e) => errors::catalog_error_to_response(e),
    }
}

pub async fn factor_by_code(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match services.factors.factor_by_code(&code).await {
        Ok(Some(factor)) => Json(factor).into_response(),
        Ok(None) => errors::domain_error_to_response(DomainError::not_found(format!(
            "emission factor '{code}'"
        ))),
        Err(e) => errors::catalog_error_to_response(e),
    }
}
