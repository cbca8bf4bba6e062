//! Emission-factor catalog storage (activity factors and gas GWP values).

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryFactorCatalog;
pub use postgres::PostgresFactorCatalog;
pub use r#trait::{CatalogError, FactorCatalog};
