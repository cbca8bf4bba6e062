use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/adjust", post(adjust))
        .route("/transfer", post(transfer))
        .route("/summary", get(summary))
        .route("/entries", get(entries))
        .route("/transfers", get(transfers))
}

pub async fn adjust(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::AdjustRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    match services
        .ledger
        .adjust(body.entity_id, body.delta_allowances, body.note)
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::TransferRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    match services
        .ledger
        .transfer(
            body.from_entity_id,
            body.to_entity_id,
            body.allowances,
            body.note,
        )
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::EntityQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    match services.ledger.summary(query.entity_id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn entries(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::EntityQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    match services.ledger.entries(query.entity_id).await {
        Ok(items) => Json(dto::Items::from(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn transfers(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::EntityQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    match services.ledger.transfers(query.entity_id).await {
        Ok(items) => Json(dto::Items::from(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
