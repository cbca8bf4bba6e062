//! Process configuration, read from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `APP_NAME` | `Carbon MVP` |
//! | `ENVIRONMENT` | `development` |
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `EU_ETS_MOCK_PRICE_EUR_PER_TCO2` | `85.0` |
//! | `LEDGER_MAX_ATTEMPTS` | `3` |
//! | `SEED_DEMO_DATA` | `false` |

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Where ledger and directory rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub app_name: String,
    pub environment: String,
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub eu_ets_price_eur_per_tco2: f64,
    pub ledger_max_attempts: u32,
    pub seed_demo_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Carbon MVP".to_string(),
            environment: "development".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            storage: StorageBackend::InMemory,
            eu_ets_price_eur_per_tco2: 85.0,
            ledger_max_attempts: 3,
            seed_demo_data: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let use_persistent: bool = parse_or(&lookup, "USE_PERSISTENT_STORES", false)?;
        let storage = if use_persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StorageBackend::Postgres {
                database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            }
        } else {
            StorageBackend::InMemory
        };

        let price: f64 = parse_or(
            &lookup,
            "EU_ETS_MOCK_PRICE_EUR_PER_TCO2",
            defaults.eu_ets_price_eur_per_tco2,
        )?;
        if !price.is_finite() || price < 0.0 {
            return Err(ConfigError::Invalid {
                key: "EU_ETS_MOCK_PRICE_EUR_PER_TCO2",
                value: price.to_string(),
            });
        }

        let ledger_max_attempts: u32 =
            parse_or(&lookup, "LEDGER_MAX_ATTEMPTS", defaults.ledger_max_attempts)?;
        if ledger_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "LEDGER_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            app_name: lookup("APP_NAME").unwrap_or(defaults.app_name),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            storage,
            eu_ets_price_eur_per_tco2: price,
            ledger_max_attempts,
            seed_demo_data: parse_or(&lookup, "SEED_DEMO_DATA", defaults.seed_demo_data)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
