use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use carbonledger_infra::allowance_store::{
    AllowanceStore, InMemoryAllowanceStore, PostgresAllowanceStore,
};
use carbonledger_infra::directory::{InMemoryOrgDirectory, OrgDirectory, PostgresOrgDirectory};
use carbonledger_infra::factors::{FactorCatalog, InMemoryFactorCatalog, PostgresFactorCatalog};
use carbonledger_infra::{
    AllowanceLedger, EuEtsPriceFeed, RetryPolicy, Settings, StorageBackend, db, seed_demo_data,
    seed_factor_catalog,
};

/// Ledger over type-erased stores, so in-memory and Postgres wiring share one type.
pub type Ledger = AllowanceLedger<Arc<dyn AllowanceStore>, Arc<dyn OrgDirectory>>;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(10);

/// Everything the handlers need; built once at startup and shared via `Extension`.
pub struct AppServices {
    pub settings: Settings,
    pub ledger: Ledger,
    pub factors: Arc<dyn FactorCatalog>,
    pub price_feed: EuEtsPriceFeed,
}

impl AppServices {
    pub fn directory(&self) -> &dyn OrgDirectory {
        &**self.ledger.directory()
    }
}

pub async fn build_services(settings: Settings) -> anyhow::Result<AppServices> {
    let (store, directory, factors): (
        Arc<dyn AllowanceStore>,
        Arc<dyn OrgDirectory>,
        Arc<dyn FactorCatalog>,
    ) = match &settings.storage {
        StorageBackend::InMemory => {
            tracing::info!("using in-memory stores");
            (
                Arc::new(InMemoryAllowanceStore::new()),
                Arc::new(InMemoryOrgDirectory::new()),
                Arc::new(InMemoryFactorCatalog::new()),
            )
        }
        StorageBackend::Postgres {
            database_url,
            max_connections,
        } => {
            tracing::info!(max_connections, "using PostgreSQL stores");
            let pool = db::connect(database_url, *max_connections)
                .await
                .context("failed to connect to DATABASE_URL")?;
            (
                Arc::new(PostgresAllowanceStore::new(pool.clone())),
                Arc::new(PostgresOrgDirectory::new(pool.clone())),
                Arc::new(PostgresFactorCatalog::new(pool)),
            )
        }
    };

    let ledger = AllowanceLedger::new(store, directory).with_retry_policy(RetryPolicy::new(
        settings.ledger_max_attempts,
        RETRY_BASE_DELAY,
    ));

    seed_factor_catalog(&*factors)
        .await
        .context("failed to seed the emission-factor catalog")?;

    if settings.seed_demo_data {
        seed_demo_data(&ledger)
            .await
            .context("failed to seed demo data")?;
    }

    Ok(AppServices {
        price_feed: EuEtsPriceFeed::new(settings.eu_ets_price_eur_per_tco2),
        ledger,
        factors,
        settings,
    })
}
