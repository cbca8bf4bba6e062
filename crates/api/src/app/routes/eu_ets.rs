use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query, rejection::QueryRejection},
    response::IntoResponse,
    routing::get,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Tonnage used by `/impact` when the query omits it.
const DEFAULT_TOTAL_CO2E_TONS: f64 = 85.0;

pub fn router() -> Router {
    Router::new()
        .route("/price", get(price))
        .route("/impact", get(impact))
}

pub async fn price(Extension(services): Extension<Arc<AppServices>>) -> Json<dto::PriceResponse> {
    Json(dto::PriceResponse {
        price_eur_per_tco2: services.price_feed.price(),
    })
}

pub async fn impact(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::ImpactQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return errors::invalid_request(e.body_text()),
    };
    let total = query.total_co2e_tons.unwrap_or(DEFAULT_TOTAL_CO2E_TONS);

    match services.price_feed.financial_impact(total) {
        Ok(financial_impact_eur) => Json(dto::ImpactResponse {
            total_co2e_tons: total,
            price_eur_per_tco2: services.price_feed.price(),
            financial_impact_eur,
        })
        .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
