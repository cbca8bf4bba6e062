//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection, ledger construction, demo seed
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent JSON error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use carbonledger_infra::Settings;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(settings: Settings) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(settings).await?);

    Ok(routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::request_tracing))
            .layer(Extension(services)),
    ))
}
