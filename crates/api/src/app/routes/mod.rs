use axum::{Router, routing::get};

pub mod allowances;
pub mod eu_ets;
pub mod factors;
pub mod org;
pub mod system;

/// Router for every endpoint; expects `Extension<Arc<AppServices>>` to be layered on.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/allowances", allowances::router())
        .nest("/org", org::router())
        .nest("/eu-ets", eu_ets::router())
        .nest("/factors", factors::router())
}
