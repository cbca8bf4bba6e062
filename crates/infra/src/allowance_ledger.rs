//! Allowance ledger service (application-level orchestration).
//!
//! `AllowanceLedger` sits between the HTTP handlers and the two storage
//! boundaries:
//!
//! ```text
//! request
//!   ↓
//! 1. Validate inputs (pure, no IO)
//!   ↓
//! 2. Check the referenced entities exist (OrgDirectory)
//!   ↓
//! 3. Append / commit in one store transaction (AllowanceStore)
//!      retried while the store reports a transient conflict
//!   ↓
//! 4. Re-derive the affected balances from the entries
//! ```
//!
//! Balances are never cached: every summary is computed from the entries at
//! the time it is requested.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use carbonledger_allowances::{
    AllowanceError, AllowanceSummary, LedgerEntry, NewLedgerEntry, NewTransfer, Transfer,
    TransferReceipt,
};
use carbonledger_core::EntityId;

use crate::allowance_store::{AllowanceStore, StoreError};
use crate::directory::{DirectoryError, OrgDirectory};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Deterministic rule failure. Nothing was written.
    #[error(transparent)]
    Rejected(#[from] AllowanceError),

    #[error("entity {0} not found")]
    UnknownEntity(EntityId),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Rejected(rejection) => LedgerError::Rejected(rejection),
            other => LedgerError::Store(other),
        }
    }
}

/// Bounded retry for transient store conflicts, with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never below 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before attempt `attempt + 1`, doubling each time (capped at 32x).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.base_delay * (1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(10))
    }
}

/// Entry point for every allowance operation.
///
/// ## Generic Parameters
///
/// - `S`: ledger storage ([`InMemoryAllowanceStore`](crate::allowance_store::InMemoryAllowanceStore)
///   in tests, Postgres in production)
/// - `D`: organization directory used to resolve entity ids
#[derive(Debug)]
pub struct AllowanceLedger<S, D> {
    store: S,
    directory: D,
    retry: RetryPolicy,
}

impl<S, D> AllowanceLedger<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self {
            store,
            directory,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

impl<S, D> AllowanceLedger<S, D>
where
    S: AllowanceStore,
    D: OrgDirectory,
{
    /// Append one signed adjustment and return the entity's new position.
    ///
    /// Zero and negative deltas are recorded as given; the balance may go
    /// below zero through this path.
    pub async fn adjust(
        &self,
        entity_id: EntityId,
        delta: f64,
        note: Option<String>,
    ) -> Result<AllowanceSummary, LedgerError> {
        let entry = NewLedgerEntry::adjustment(entity_id, delta, note)?;
        self.ensure_entity(entity_id).await?;

        let stored = self
            .with_retry("append_entry", || self.store.append_entry(entry.clone()))
            .await?;

        tracing::info!(
            entity_id = %entity_id,
            entry_id = %stored.id,
            delta,
            "allowance adjustment recorded"
        );

        self.summary(entity_id).await
    }

    /// Current position. Entities without entries (known or not) report zeros.
    pub async fn summary(&self, entity_id: EntityId) -> Result<AllowanceSummary, LedgerError> {
        let owned = self
            .with_retry("owned_balance", || self.store.owned_balance(entity_id))
            .await?;
        Ok(AllowanceSummary::from_owned(entity_id, owned))
    }

    /// Move `amount` allowances between two entities.
    ///
    /// The balance check and both legs commit in one store transaction; on
    /// any rejection nothing is written.
    pub async fn transfer(
        &self,
        from_entity_id: EntityId,
        to_entity_id: EntityId,
        amount: f64,
        note: Option<String>,
    ) -> Result<TransferReceipt, LedgerError> {
        let transfer = NewTransfer::new(from_entity_id, to_entity_id, amount, note)
            .inspect_err(|rejection| {
                tracing::debug!(%from_entity_id, %to_entity_id, amount, %rejection, "transfer rejected");
            })?;
        self.ensure_entity(from_entity_id).await?;
        self.ensure_entity(to_entity_id).await?;

        let committed = match self
            .with_retry("commit_transfer", || {
                self.store.commit_transfer(transfer.clone())
            })
            .await
        {
            Ok(committed) => committed,
            Err(StoreError::Rejected(rejection)) => {
                tracing::debug!(%from_entity_id, %to_entity_id, amount, %rejection, "transfer rejected");
                return Err(rejection.into());
            }
            Err(other) => return Err(other.into()),
        };

        tracing::info!(
            transfer_id = %committed.id,
            %from_entity_id,
            %to_entity_id,
            amount,
            "allowance transfer committed"
        );

        Ok(TransferReceipt {
            transfer_id: committed.id,
            from_balance: self.summary(from_entity_id).await?,
            to_balance: self.summary(to_entity_id).await?,
        })
    }

    /// Audit trail: the entity's entries in id order.
    pub async fn entries(&self, entity_id: EntityId) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .with_retry("entries_for", || self.store.entries_for(entity_id))
            .await?)
    }

    /// Audit trail: transfers the entity took part in, in id order.
    pub async fn transfers(&self, entity_id: EntityId) -> Result<Vec<Transfer>, LedgerError> {
        Ok(self
            .with_retry("transfers_for", || self.store.transfers_for(entity_id))
            .await?)
    }

    async fn ensure_entity(&self, entity_id: EntityId) -> Result<(), LedgerError> {
        if self.directory.entity_exists(entity_id).await? {
            Ok(())
        } else {
            Err(LedgerError::UnknownEntity(entity_id))
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut run: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match run().await {
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "transient store failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
