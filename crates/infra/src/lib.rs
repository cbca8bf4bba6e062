//! Infrastructure layer: stores, ledger service, configuration, external feeds.

pub mod allowance_ledger;
pub mod allowance_store;
pub mod config;
pub mod db;
pub mod directory;
pub mod eu_ets;
pub mod factors;
pub mod seed;

#[cfg(test)]
mod integration_tests;

pub use allowance_ledger::{AllowanceLedger, LedgerError, RetryPolicy};
pub use config::{ConfigError, Settings, StorageBackend};
pub use eu_ets::EuEtsPriceFeed;
pub use seed::{SeedError, seed_demo_data, seed_factor_catalog};
