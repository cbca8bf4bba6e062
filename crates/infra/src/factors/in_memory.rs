use std::sync::RwLock;

use async_trait::async_trait;

use carbonledger_core::{DomainError, FactorId, GasId};
use carbonledger_factors::{EmissionFactor, GasGwp, NewEmissionFactor, NewGasGwp};

use super::r#trait::{CatalogError, FactorCatalog};

#[derive(Debug, Default)]
struct CatalogTables {
    factors: Vec<EmissionFactor>,
    gwp: Vec<GasGwp>,
}

/// In-memory factor catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFactorCatalog {
    tables: RwLock<CatalogTables>,
}

impl InMemoryFactorCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> CatalogError {
    CatalogError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl FactorCatalog for InMemoryFactorCatalog {
    async fn add_factor(&self, factor: NewEmissionFactor) -> Result<EmissionFactor, CatalogError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.factors.iter().any(|f| f.code == factor.code) {
            return Err(DomainError::conflict(format!("factor '{}' already exists", factor.code)).into());
        }
        let stored = factor.into_factor(FactorId::new(tables.factors.len() as i64 + 1));
        tables.factors.push(stored.clone());
        Ok(stored)
    }

    async fn list_factors(&self) -> Result<Vec<EmissionFactor>, CatalogError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.factors.clone())
    }

    async fn factor_by_code(&self, code: &str) -> Result<Option<EmissionFactor>, CatalogError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.factors.iter().find(|f| f.code == code).cloned())
    }

    async fn add_gwp(&self, gwp: NewGasGwp) -> Result<GasGwp, CatalogError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        if tables.gwp.iter().any(|g| g.gas == gwp.gas) {
            return Err(DomainError::conflict(format!("gas '{}' already exists", gwp.gas)).into());
        }
        let stored = gwp.into_gwp(GasId::new(tables.gwp.len() as i64 + 1));
        tables.gwp.push(stored.clone());
        Ok(stored)
    }

    async fn list_gwp(&self) -> Result<Vec<GasGwp>, CatalogError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.gwp.clone())
    }
}
