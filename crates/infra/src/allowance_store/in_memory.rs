use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use carbonledger_allowances::{LedgerEntry, NewLedgerEntry, NewTransfer, Transfer, owned_balance};
use carbonledger_core::{EntityId, EntryId, TransferId};

use super::r#trait::{AllowanceStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    entries: Vec<LedgerEntry>,
    transfers: Vec<Transfer>,
}

impl Tables {
    fn push_entry(&mut self, entry: NewLedgerEntry) -> LedgerEntry {
        let stored = LedgerEntry {
            id: EntryId::new(self.entries.len() as i64 + 1),
            entity_id: entry.entity_id,
            delta: entry.delta,
            note: entry.note,
            created_at: Utc::now(),
        };
        self.entries.push(stored.clone());
        stored
    }
}

/// In-memory append-only allowance store.
///
/// Intended for tests/dev. A single lock guards both tables: transfers hold the
/// write lock across the balance check and all three inserts, so concurrent
/// transfers are serialized and readers never see half a transfer.
#[derive(Debug, Default)]
pub struct InMemoryAllowanceStore {
    tables: RwLock<Tables>,
}

impl InMemoryAllowanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries across all entities.
    pub fn entry_count(&self) -> usize {
        self.tables.read().map(|t| t.entries.len()).unwrap_or(0)
    }

    /// Total number of committed transfers.
    pub fn transfer_count(&self) -> usize {
        self.tables.read().map(|t| t.transfers.len()).unwrap_or(0)
    }

    /// Sum of every delta in the store.
    pub fn total_allowances(&self) -> f64 {
        self.tables
            .read()
            .map(|t| t.entries.iter().map(|e| e.delta).sum())
            .unwrap_or(0.0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait]
impl AllowanceStore for InMemoryAllowanceStore {
    async fn append_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        entry.ensure_applicable(owned_balance(entry.entity_id, &tables.entries))?;
        Ok(tables.push_entry(entry))
    }

    async fn owned_balance(&self, entity_id: EntityId) -> Result<f64, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(owned_balance(entity_id, &tables.entries))
    }

    async fn commit_transfer(&self, transfer: NewTransfer) -> Result<Transfer, StoreError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;

        let owned = owned_balance(transfer.from_entity_id(), &tables.entries);
        transfer.ensure_covered(owned)?;
        transfer.ensure_receivable(owned_balance(transfer.to_entity_id(), &tables.entries))?;

        let id = TransferId::new(tables.transfers.len() as i64 + 1);
        for leg in transfer.legs(id) {
            tables.push_entry(leg);
        }
        let committed = transfer.into_committed(id, Utc::now());
        tables.transfers.push(committed.clone());

        Ok(committed)
    }

    async fn entries_for(&self, entity_id: EntityId) -> Result<Vec<LedgerEntry>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn transfers_for(&self, entity_id: EntityId) -> Result<Vec<Transfer>, StoreError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables
            .transfers
            .iter()
            .filter(|t| t.involves(entity_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonledger_allowances::AllowanceError;

    fn entity(id: i64) -> EntityId {
        EntityId::new(id)
    }

    async fn seeded(amount: f64) -> InMemoryAllowanceStore {
        let store = InMemoryAllowanceStore::new();
        store
            .append_entry(NewLedgerEntry::adjustment(entity(1), amount, Some("seed".into())).unwrap())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn entry_ids_are_monotonic() {
        let store = InMemoryAllowanceStore::new();
        let a = store
            .append_entry(NewLedgerEntry::adjustment(entity(1), 1.0, None).unwrap())
            .await
            .unwrap();
        let b = store
            .append_entry(NewLedgerEntry::adjustment(entity(2), 1.0, None).unwrap())
            .await
            .unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn committed_transfer_writes_transfer_and_both_legs() {
        let store = seeded(5000.0).await;
        let t = NewTransfer::new(entity(1), entity(2), 1200.0, Some("Q3 settlement".into())).unwrap();

        let committed = store.commit_transfer(t).await.unwrap();
        assert_eq!(committed.id, TransferId::new(1));
        assert_eq!(committed.note.as_deref(), Some("Q3 settlement"));

        assert_eq!(store.owned_balance(entity(1)).await.unwrap(), 3800.0);
        assert_eq!(store.owned_balance(entity(2)).await.unwrap(), 1200.0);

        let notes: Vec<_> = store
            .entries_for(entity(1))
            .await
            .unwrap()
            .into_iter()
            .filter_map(|e| e.note)
            .collect();
        assert_eq!(notes, vec!["seed".to_string(), "transfer_out:1".to_string()]);

        let incoming = store.entries_for(entity(2)).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].note.as_deref(), Some("transfer_in:1"));
    }

    #[tokio::test]
    async fn uncovered_transfer_writes_nothing() {
        let store = seeded(100.0).await;
        let t = NewTransfer::new(entity(1), entity(2), 100.5, None).unwrap();

        let err = store.commit_transfer(t).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(AllowanceError::InsufficientBalance { .. })
        ));
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn overflowing_adjustment_writes_nothing() {
        let store = seeded(f64::MAX).await;
        let err = store
            .append_entry(NewLedgerEntry::adjustment(entity(1), f64::MAX, None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(AllowanceError::BalanceOverflow { .. })
        ));
        assert_eq!(store.entry_count(), 1);
        assert_eq!(store.owned_balance(entity(1)).await.unwrap(), f64::MAX);
    }

    #[tokio::test]
    async fn transfer_that_would_overflow_the_destination_writes_nothing() {
        let store = seeded(f64::MAX).await;
        store
            .append_entry(NewLedgerEntry::adjustment(entity(2), f64::MAX, None).unwrap())
            .await
            .unwrap();

        let t = NewTransfer::new(entity(1), entity(2), f64::MAX, None).unwrap();
        let err = store.commit_transfer(t).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(AllowanceError::BalanceOverflow { .. })
        ));
        assert_eq!(store.entry_count(), 2);
        assert_eq!(store.transfer_count(), 0);
    }

    #[tokio::test]
    async fn transfers_are_listed_for_both_parties() {
        let store = seeded(10.0).await;
        store
            .commit_transfer(NewTransfer::new(entity(1), entity(2), 4.0, None).unwrap())
            .await
            .unwrap();

        assert_eq!(store.transfers_for(entity(1)).await.unwrap().len(), 1);
        assert_eq!(store.transfers_for(entity(2)).await.unwrap().len(), 1);
        assert!(store.transfers_for(entity(3)).await.unwrap().is_empty());
    }
}
