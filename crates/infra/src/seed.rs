//! Startup data: the emission-factor catalog (always) and the demo
//! organization (`SEED_DEMO_DATA=true`).

use thiserror::Error;

use carbonledger_core::DomainError;
use carbonledger_factors::{NewEmissionFactor, NewGasGwp, Scope};
use carbonledger_org::{NewEntity, NewFacility, NewGroup};

use crate::allowance_ledger::{AllowanceLedger, LedgerError};
use crate::allowance_store::AllowanceStore;
use crate::directory::{DirectoryError, OrgDirectory};
use crate::factors::{CatalogError, FactorCatalog};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// (code, name, unit, kg CO2 per unit, scope)
const EMISSION_FACTORS: [(&str, &str, &str, f64, Scope); 6] = [
    ("electricity_TR", "Electricity TR Grid", "kWh", 0.42, Scope::Scope2),
    ("diesel", "Diesel", "L", 2.68, Scope::Scope1),
    ("petrol", "Petrol", "L", 2.31, Scope::Scope1),
    ("natural_gas", "Natural Gas", "m3", 1.90, Scope::Scope1),
    ("road_km", "Road Freight", "km", 0.12, Scope::Scope3),
    ("air_km", "Business Air Travel", "km", 0.25, Scope::Scope3),
];

/// (gas, GWP100)
const GAS_GWP: [(&str, f64); 2] = [("CH4", 28.0), ("N2O", 265.0)];

/// Load the reference factor catalog.
///
/// Returns `false` without writing anything when factors are already present.
pub async fn seed_factor_catalog<C>(catalog: &C) -> Result<bool, SeedError>
where
    C: FactorCatalog + ?Sized,
{
    if !catalog.list_factors().await?.is_empty() {
        tracing::debug!("factor catalog already populated");
        return Ok(false);
    }

    for (code, name, unit, factor, scope) in EMISSION_FACTORS {
        catalog
            .add_factor(NewEmissionFactor::new(code, name, unit, factor, scope)?)
            .await?;
    }
    for (gas, gwp100) in GAS_GWP {
        catalog.add_gwp(NewGasGwp::new(gas, gwp100)?).await?;
    }

    tracing::info!(
        factors = EMISSION_FACTORS.len(),
        gases = GAS_GWP.len(),
        "factor catalog seeded"
    );
    Ok(true)
}

/// (entity, yearly budget tCO2e, facility, starting allowances)
const DEMO_ENTITIES: [(&str, f64, &str, f64); 2] = [
    ("Acme Foods", 10_000.0, "Izmir Plant", 5_000.0),
    ("Acme Logistics", 7_000.0, "Ankara Hub", 3_000.0),
];

/// Create the demo organization and its starting allowances.
///
/// Returns `false` without writing anything when the directory already holds
/// entities. Allowances go through [`AllowanceLedger::adjust`].
pub async fn seed_demo_data<S, D>(ledger: &AllowanceLedger<S, D>) -> Result<bool, SeedError>
where
    S: AllowanceStore,
    D: OrgDirectory,
{
    let directory = ledger.directory();
    if !directory.list_entities().await?.is_empty() {
        tracing::info!("directory already populated, skipping demo seed");
        return Ok(false);
    }

    let group = directory.create_group(NewGroup::new("Acme Group")?).await?;

    for (name, budget, facility, allowances) in DEMO_ENTITIES {
        let entity = directory
            .create_entity(NewEntity::new(group.id, name, Some(budget))?)
            .await?;
        directory
            .create_facility(NewFacility::new(entity.id, facility)?)
            .await?;
        ledger
            .adjust(entity.id, allowances, Some("seed".to_string()))
            .await?;
    }

    tracing::info!(group_id = %group.id, "demo data seeded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowance_store::InMemoryAllowanceStore;
    use crate::directory::InMemoryOrgDirectory;
    use crate::factors::InMemoryFactorCatalog;

    #[tokio::test]
    async fn seeds_once() {
        let ledger = AllowanceLedger::new(InMemoryAllowanceStore::new(), InMemoryOrgDirectory::new());

        assert!(seed_demo_data(&ledger).await.unwrap());
        assert!(!seed_demo_data(&ledger).await.unwrap());

        let entities = ledger.directory().list_entities().await.unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].name, "Acme Foods");
        assert_eq!(entities[1].yearly_budget_tco2e, 7_000.0);
        assert_eq!(ledger.directory().list_facilities().await.unwrap().len(), 2);

        assert_eq!(ledger.summary(entities[0].id).await.unwrap().owned, 5_000.0);
        assert_eq!(ledger.summary(entities[1].id).await.unwrap().owned, 3_000.0);

        let entries = ledger.entries(entities[0].id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].note.as_deref(), Some("seed"));
        assert_eq!(ledger.store().entry_count(), 2);
    }

    #[tokio::test]
    async fn factor_catalog_is_seeded_once() {
        let catalog = InMemoryFactorCatalog::new();

        assert!(seed_factor_catalog(&catalog).await.unwrap());
        assert!(!seed_factor_catalog(&catalog).await.unwrap());

        let factors = catalog.list_factors().await.unwrap();
        let codes: Vec<_> = factors.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(
            codes,
            vec!["electricity_TR", "diesel", "petrol", "natural_gas", "road_km", "air_km"]
        );

        let electricity = catalog.factor_by_code("electricity_TR").await.unwrap().unwrap();
        assert_eq!(electricity.factor_kgco2_per_unit, 0.42);
        assert_eq!(electricity.scope_hint, Scope::Scope2);

        let gwp = catalog.list_gwp().await.unwrap();
        assert_eq!(gwp.len(), 2);
        assert_eq!(gwp[1].gas, "N2O");
        assert_eq!(gwp[1].gwp100, 265.0);
    }
}
