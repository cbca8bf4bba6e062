//! PostgreSQL connection and error classification shared by the persistent stores.
//!
//! ## SQLSTATE mapping
//!
//! | SQLSTATE | Meaning | `SqlFailure` |
//! |----------|---------|--------------|
//! | `40001` | serialization failure | `Transient` |
//! | `40P01` | deadlock detected | `Transient` |
//! | `23505` | unique violation | `UniqueViolation` |
//! | `23503` | foreign key violation | `ForeignKeyViolation` |
//! | `23514` | check constraint violation | `CheckViolation` |
//! | other / no code | – | `Other` |
//!
//! Pool and IO failures classify as `Unavailable`.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Schema applied at startup. Every statement is idempotent.
pub const SCHEMA: &str = include_str!("../migrations/0001_carbonledger.sql");

/// Connect a pool and make sure the schema exists.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

/// Two-key advisory lock serializing concurrent schema application.
///
/// The single-key space belongs to the ledger's per-entity locks.
pub(crate) const SCHEMA_LOCK: (i32, i32) = (0x0CA2_B0_1E, 1);

/// Apply [`SCHEMA`] in one transaction, holding an advisory lock so several
/// processes (or test pools) starting together do not race on DDL.
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(SCHEMA_LOCK.0)
        .bind(SCHEMA_LOCK.1)
        .execute(&mut *tx)
        .await?;
    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await?;
    tx.commit().await?;
    tracing::info!("database schema applied");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqlFailure {
    Transient,
    UniqueViolation,
    ForeignKeyViolation,
    CheckViolation,
    Unavailable,
    Other,
}

pub(crate) fn classify(err: &sqlx::Error) -> SqlFailure {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some("40001") | Some("40P01") => SqlFailure::Transient,
            Some("23505") => SqlFailure::UniqueViolation,
            Some("23503") => SqlFailure::ForeignKeyViolation,
            Some("23514") => SqlFailure::CheckViolation,
            _ => SqlFailure::Other,
        },
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            SqlFailure::Unavailable
        }
        _ => SqlFailure::Other,
    }
}

/// Human-readable message for an error raised inside `operation`.
pub(crate) fn describe(operation: &str, err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => {
            format!("database error in {}: {}", operation, db_err.message())
        }
        _ => format!("sqlx error in {}: {}", operation, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_are_unavailable() {
        assert_eq!(classify(&sqlx::Error::PoolClosed), SqlFailure::Unavailable);
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), SqlFailure::Unavailable);
    }

    #[test]
    fn row_not_found_is_other() {
        assert_eq!(classify(&sqlx::Error::RowNotFound), SqlFailure::Other);
    }

    #[test]
    fn schema_declares_both_ledger_tables() {
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS ledger_entries"));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS transfers"));
    }
}
