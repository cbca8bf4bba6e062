//! Postgres-backed allowance store.
//!
//! ## Write serialization
//!
//! Every write runs in one transaction that first takes the single-key
//! advisory lock `pg_advisory_xact_lock(entity_id)` for each entity whose
//! balance it changes. A transfer locks both parties in ascending id order, so
//! two opposite transfers cannot deadlock. Balance reads and the inserts that
//! follow therefore never interleave with another write to the same entity.
//! The locks are released by commit or rollback.
//!
//! The single 64-bit key space is reserved for entity ids; schema bootstrap
//! uses the two-key form (see [`crate::db`]), which Postgres keeps separate.
//!
//! ## Error Mapping
//!
//! | SQLx failure | StoreError |
//! |--------------|------------|
//! | serialization failure / deadlock | `Conflict` (retried by the ledger) |
//! | foreign key / check violation | `Constraint` |
//! | pool closed / timed out / IO | `Unavailable` |
//! | other | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use carbonledger_allowances::{LedgerEntry, NewLedgerEntry, NewTransfer, Transfer};
use carbonledger_core::{EntityId, EntryId, TransferId};

use super::r#trait::{AllowanceStore, StoreError};
use crate::db::{SqlFailure, classify, describe};

/// Postgres-backed append-only allowance store.
///
/// `PgPool` is internally reference counted; cloning the store is cheap.
#[derive(Debug, Clone)]
pub struct PostgresAllowanceStore {
    pool: PgPool,
}

impl PostgresAllowanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ENTRY_COLUMNS: &str = "id, entity_id, delta, note, created_at";
const TRANSFER_COLUMNS: &str = "id, from_entity_id, to_entity_id, amount, note, created_at";

#[async_trait]
impl AllowanceStore for PostgresAllowanceStore {
    #[instrument(skip(self, entry), fields(entity_id = %entry.entity_id), err)]
    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        lock_entity(&mut tx, entry.entity_id).await?;
        let owned = balance_in(&mut tx, entry.entity_id).await?;
        if let Err(rejection) = entry.ensure_applicable(owned) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(rejection.into());
        }

        let row = sqlx::query(&format!(
            "INSERT INTO ledger_entries (entity_id, delta, note) VALUES ($1, $2, $3) RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(entry.entity_id.get())
        .bind(entry.delta)
        .bind(&entry.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("append_entry", e))?;

        let stored = EntryRow::from_row(&row)
            .map(LedgerEntry::from)
            .map_err(|e| map_sqlx_error("decode_entry", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(stored)
    }

    #[instrument(skip(self), fields(entity_id = %entity_id), err)]
    async fn owned_balance(&self, entity_id: EntityId) -> Result<f64, StoreError> {
        // One statement: both legs of a transfer commit together, so the
        // aggregate sees either both or neither.
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(delta), 0)::DOUBLE PRECISION FROM ledger_entries WHERE entity_id = $1",
        )
        .bind(entity_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("owned_balance", e))
    }

    #[instrument(
        skip(self, transfer),
        fields(
            from_entity_id = %transfer.from_entity_id(),
            to_entity_id = %transfer.to_entity_id(),
            amount = transfer.amount()
        ),
        err
    )]
    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let (from, to) = (transfer.from_entity_id(), transfer.to_entity_id());
        lock_entity(&mut tx, from.min(to)).await?;
        lock_entity(&mut tx, from.max(to)).await?;

        let owned = balance_in(&mut tx, from).await?;
        let to_owned = balance_in(&mut tx, to).await?;

        let checked = transfer
            .ensure_covered(owned)
            .and_then(|()| transfer.ensure_receivable(to_owned));
        if let Err(rejection) = checked {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(rejection.into());
        }

        let row = sqlx::query(
            r#"
            INSERT INTO transfers (from_entity_id, to_entity_id, amount, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(transfer.from_entity_id().get())
        .bind(transfer.to_entity_id().get())
        .bind(transfer.amount())
        .bind(transfer.note())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_transfer", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("decode_transfer", e))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| map_sqlx_error("decode_transfer", e))?;
        let transfer_id = TransferId::new(id);

        for leg in transfer.legs(transfer_id) {
            sqlx::query("INSERT INTO ledger_entries (entity_id, delta, note) VALUES ($1, $2, $3)")
                .bind(leg.entity_id.get())
                .bind(leg.delta)
                .bind(&leg.note)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_transfer_leg", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(transfer.into_committed(transfer_id, created_at))
    }

    #[instrument(skip(self), fields(entity_id = %entity_id), err)]
    async fn entries_for(&self, entity_id: EntityId) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE entity_id = $1 ORDER BY id ASC"
        ))
        .bind(entity_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("entries_for", e))?;

        rows.iter()
            .map(|row| {
                EntryRow::from_row(row)
                    .map(LedgerEntry::from)
                    .map_err(|e| map_sqlx_error("decode_entry", e))
            })
            .collect()
    }

    #[instrument(skip(self), fields(entity_id = %entity_id), err)]
    async fn transfers_for(&self, entity_id: EntityId) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfers WHERE from_entity_id = $1 OR to_entity_id = $1 ORDER BY id ASC"
        ))
        .bind(entity_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transfers_for", e))?;

        rows.iter()
            .map(|row| {
                TransferRow::from_row(row)
                    .map(Transfer::from)
                    .map_err(|e| map_sqlx_error("decode_transfer", e))
            })
            .collect()
    }
}

async fn lock_entity(
    tx: &mut Transaction<'_, Postgres>,
    entity_id: EntityId,
) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(entity_id.get())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_entity", e))?;
    Ok(())
}

async fn balance_in(
    tx: &mut Transaction<'_, Postgres>,
    entity_id: EntityId,
) -> Result<f64, StoreError> {
    sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(delta), 0)::DOUBLE PRECISION FROM ledger_entries WHERE entity_id = $1",
    )
    .bind(entity_id.get())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("balance", e))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    let msg = describe(operation, &err);
    match classify(&err) {
        SqlFailure::Transient => StoreError::Conflict(msg),
        SqlFailure::ForeignKeyViolation | SqlFailure::CheckViolation | SqlFailure::UniqueViolation => {
            StoreError::Constraint(msg)
        }
        SqlFailure::Unavailable => StoreError::Unavailable(msg),
        SqlFailure::Other => StoreError::Backend(msg),
    }
}

// SQLx row types

#[derive(Debug)]
struct EntryRow {
    id: i64,
    entity_id: i64,
    delta: f64,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for EntryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(EntryRow {
            id: row.try_get("id")?,
            entity_id: row.try_get("entity_id")?,
            delta: row.try_get("delta")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<EntryRow> for LedgerEntry {
    fn from(row: EntryRow) -> Self {
        LedgerEntry {
            id: EntryId::new(row.id),
            entity_id: EntityId::new(row.entity_id),
            delta: row.delta,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct TransferRow {
    id: i64,
    from_entity_id: i64,
    to_entity_id: i64,
    amount: f64,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for TransferRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransferRow {
            id: row.try_get("id")?,
            from_entity_id: row.try_get("from_entity_id")?,
            to_entity_id: row.try_get("to_entity_id")?,
            amount: row.try_get("amount")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<TransferRow> for Transfer {
    fn from(row: TransferRow) -> Self {
        Transfer {
            id: TransferId::new(row.id),
            from_entity_id: EntityId::new(row.from_entity_id),
            to_entity_id: EntityId::new(row.to_entity_id),
            amount: row.amount,
            note: row.note,
            created_at: row.created_at,
        }
    }
}
