use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use carbonledger_core::DomainError;
use carbonledger_factors::{EmissionFactor, GasGwp, NewEmissionFactor, NewGasGwp};

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Validation or duplicate code.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("factor catalog storage error: {0}")]
    Backend(String),
}

/// Read-mostly reference data used to convert activity into emissions.
#[async_trait]
pub trait FactorCatalog: Send + Sync {
    /// Fails with `Conflict` if the code is taken.
    async fn add_factor(&self, factor: NewEmissionFactor) -> Result<EmissionFactor, CatalogError>;

    /// All factors in id order.
    async fn list_factors(&self) -> Result<Vec<EmissionFactor>, CatalogError>;

    async fn factor_by_code(&self, code: &str) -> Result<Option<EmissionFactor>, CatalogError>;

    /// Fails with `Conflict` if the gas is already listed.
    async fn add_gwp(&self, gwp: NewGasGwp) -> Result<GasGwp, CatalogError>;

    /// All GWP rows in id order.
    async fn list_gwp(&self) -> Result<Vec<GasGwp>, CatalogError>;
}

#[async_trait]
impl<C> FactorCatalog for Arc<C>
where
    C: FactorCatalog + ?Sized,
{
    async fn add_factor(&self, factor: NewEmissionFactor) -> Result<EmissionFactor, CatalogError> {
        (**self).add_factor(factor).await
    }

    async fn list_factors(&self) -> Result<Vec<EmissionFactor>, CatalogError> {
        (**self).list_factors().await
    }

    async fn factor_by_code(&self, code: &str) -> Result<Option<EmissionFactor>, CatalogError> {
        (**self).factor_by_code(code).await
    }

    async fn add_gwp(&self, gwp: NewGasGwp) -> Result<GasGwp, CatalogError> {
        (**self).add_gwp(gwp).await
    }

    async fn list_gwp(&self) -> Result<Vec<GasGwp>, CatalogError> {
        (**self).list_gwp().await
    }
}
