use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use carbonledger_allowances::{AllowanceError, LedgerEntry, NewLedgerEntry, NewTransfer, Transfer};
use carbonledger_core::EntityId;

/// Allowance store operation error.
///
/// ## Error Categories
///
/// - **Rejected**: an allowance rule evaluated inside the store transaction failed
///   (nothing was written)
/// - **Conflict**: the transaction lost a race (serialization failure, deadlock);
///   safe to retry
/// - **Constraint**: the database refused the rows (e.g. unknown entity reference)
/// - **Unavailable**: the backend could not be reached
/// - **Backend**: anything else
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Rejected(#[from] AllowanceError),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Append/query boundary used by the allowance ledger.
///
/// ## Implementation Requirements
///
/// - `append_entry` and `commit_transfer` are atomic (one transaction each)
/// - `append_entry` evaluates [`NewLedgerEntry::ensure_applicable`] against the
///   entity's balance inside the transaction
/// - `commit_transfer` evaluates [`NewTransfer::ensure_covered`] and
///   [`NewTransfer::ensure_receivable`] **inside** the transaction, serialized
///   against other writes to either entity, then writes the transfer row and
///   both of its legs (see [`NewTransfer::legs`]) or nothing at all
/// - `owned_balance` never observes one leg of a transfer without the other
/// - ids are assigned monotonically
#[async_trait]
pub trait AllowanceStore: Send + Sync {
    /// Append one ledger entry.
    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Sum of all deltas for the entity (0 when it has no entries).
    async fn owned_balance(&self, entity_id: EntityId) -> Result<f64, StoreError>;

    /// Check the source balance and commit the transfer with its two legs.
    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, StoreError>;

    /// The entity's ledger entries in id order.
    async fn entries_for(&self, entity_id: EntityId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Transfers where the entity is source or destination, in id order.
    async fn transfers_for(&self, entity_id: EntityId) -> Result<Vec<Transfer>, StoreError>;
}

#[async_trait]
impl<S> AllowanceStore for Arc<S>
where
    S: AllowanceStore + ?Sized,
{
    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        (**self).append_entry(entry).await
    }

    async fn owned_balance(&self, entity_id: EntityId) -> Result<f64, StoreError> {
        (**self).owned_balance(entity_id).await
    }

    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        (**self).commit_transfer(transfer).await
    }

    async fn entries_for(&self, entity_id: EntityId) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).entries_for(entity_id).await
    }

    async fn transfers_for(&self, entity_id: EntityId) -> Result<Vec<Transfer>, StoreError> {
        (**self).transfers_for(entity_id).await
    }
}
