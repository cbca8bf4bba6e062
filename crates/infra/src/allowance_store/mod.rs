//! Transactional, append-only storage for the allowance ledger.
//!
//! Two tables, both append-only: ledger entries and transfers. Stores never
//! update or delete rows and never cache balances; balances are always an
//! aggregate over the entries.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryAllowanceStore;
pub use postgres::PostgresAllowanceStore;
pub use r#trait::{AllowanceStore, StoreError};
