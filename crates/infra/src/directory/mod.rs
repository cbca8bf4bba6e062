//! Organization directory storage (groups, entities, facilities).
//!
//! The allowance ledger only needs `entity_exists`; the rest backs the
//! `/org` routes.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryOrgDirectory;
pub use postgres::PostgresOrgDirectory;
pub use r#trait::{DirectoryError, OrgDirectory};
