use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use carbonledger_infra::directory::OrgDirectory;
use carbonledger_org::{NewEntity, NewFacility, NewGroup};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/entities", get(list_entities).post(create_entity))
        .route("/facilities", get(list_facilities).post(create_facility))
}

pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateGroupRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    let group = match NewGroup::new(body.name) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.directory().create_group(group).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

pub async fn list_groups(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.directory().list_groups().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

pub async fn create_entity(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateEntityRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    let entity = match NewEntity::new(body.group_id, body.name, body.yearly_budget_tco2e) {
        Ok(e) => e,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.directory().create_entity(entity).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

pub async fn list_entities(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.directory().list_entities().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

pub async fn create_facility(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateFacilityRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_request(e.body_text()),
    };

    let facility = match NewFacility::new(body.entity_id, body.name) {
        Ok(f) => f,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.directory().create_facility(facility).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}

pub async fn list_facilities(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.directory().list_facilities().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::directory_error_to_response(e),
    }
}
