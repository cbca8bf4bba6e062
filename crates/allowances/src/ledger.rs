use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carbonledger_core::{EntityId, EntryId, TransferId};

/// Rejection raised by the allowance rules.
///
/// Every variant is deterministic: retrying the same request against the same
/// ledger state yields the same rejection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllowanceError {
    /// Transfer amount is zero, negative or not a finite number.
    #[error("allowances must be a positive number (got {0})")]
    InvalidAmount(f64),

    /// Adjustment delta is NaN or infinite.
    #[error("delta_allowances must be a finite number (got {0})")]
    InvalidDelta(f64),

    /// Source and destination of a transfer are the same entity.
    #[error("entity {0} cannot transfer allowances to itself")]
    SelfTransfer(EntityId),

    /// Source entity does not own enough allowances.
    #[error("insufficient allowances: entity {entity_id} owns {owned}, requested {requested}")]
    InsufficientBalance {
        entity_id: EntityId,
        owned: f64,
        requested: f64,
    },

    /// Applying `delta` would push the balance outside the finite range.
    #[error("balance of entity {entity_id} ({owned}) cannot absorb {delta}")]
    BalanceOverflow {
        entity_id: EntityId,
        owned: f64,
        delta: f64,
    },
}

/// Balance after applying `delta`, provided it stays finite.
fn apply_delta(entity_id: EntityId, owned: f64, delta: f64) -> Result<f64, AllowanceError> {
    let next = owned + delta;
    if !owned.is_finite() || !next.is_finite() {
        return Err(AllowanceError::BalanceOverflow {
            entity_id,
            owned,
            delta,
        });
    }
    Ok(next)
}

/// One append-only signed adjustment to an entity's allowance balance (immutable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub entity_id: EntityId,
    /// Positive = granted/received, negative = consumed/sent.
    pub delta: f64,
    /// Audit annotation only; never interpreted by ledger logic.
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub entity_id: EntityId,
    pub delta: f64,
    pub note: Option<String>,
}

impl NewLedgerEntry {
    /// Grant, consumption or correction entered from outside the transfer path.
    ///
    /// Any finite delta is accepted, including zero and values that drive the
    /// balance below zero.
    pub fn adjustment(
        entity_id: EntityId,
        delta: f64,
        note: Option<String>,
    ) -> Result<Self, AllowanceError> {
        if !delta.is_finite() {
            return Err(AllowanceError::InvalidDelta(delta));
        }
        Ok(Self {
            entity_id,
            delta,
            note,
        })
    }

    /// Range rule: the entity's balance must stay finite once the entry lands.
    pub fn ensure_applicable(&self, owned: f64) -> Result<(), AllowanceError> {
        apply_delta(self.entity_id, owned, self.delta).map(|_| ())
    }
}

/// Which side of a transfer a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferLeg {
    Out,
    In,
}

impl TransferLeg {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferLeg::Out => "transfer_out",
            TransferLeg::In => "transfer_in",
        }
    }

    /// Audit note linking a leg back to its transfer, e.g. `transfer_out:12`.
    pub fn note(self, transfer_id: TransferId) -> String {
        format!("{}:{}", self.as_str(), transfer_id)
    }
}

/// A validated transfer request, ready to be committed by a store.
///
/// Construction enforces the amount and self-transfer rules; the balance rule
/// depends on ledger state and is checked by the store inside its transaction
/// via [`NewTransfer::ensure_covered`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    from_entity_id: EntityId,
    to_entity_id: EntityId,
    amount: f64,
    note: Option<String>,
}

impl NewTransfer {
    pub fn new(
        from_entity_id: EntityId,
        to_entity_id: EntityId,
        amount: f64,
        note: Option<String>,
    ) -> Result<Self, AllowanceError> {
        // NaN fails the comparison as well.
        if !(amount > 0.0) || !amount.is_finite() {
            return Err(AllowanceError::InvalidAmount(amount));
        }
        if from_entity_id == to_entity_id {
            return Err(AllowanceError::SelfTransfer(from_entity_id));
        }
        Ok(Self {
            from_entity_id,
            to_entity_id,
            amount,
            note,
        })
    }

    pub fn from_entity_id(&self) -> EntityId {
        self.from_entity_id
    }

    pub fn to_entity_id(&self) -> EntityId {
        self.to_entity_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Balance rule: the source must own at least `amount`.
    pub fn ensure_covered(&self, owned: f64) -> Result<(), AllowanceError> {
        if !owned.is_finite() {
            return Err(AllowanceError::BalanceOverflow {
                entity_id: self.from_entity_id,
                owned,
                delta: -self.amount,
            });
        }
        if owned < self.amount {
            return Err(AllowanceError::InsufficientBalance {
                entity_id: self.from_entity_id,
                owned,
                requested: self.amount,
            });
        }
        Ok(())
    }

    /// Range rule for the destination: its balance must stay finite.
    pub fn ensure_receivable(&self, to_owned: f64) -> Result<(), AllowanceError> {
        apply_delta(self.to_entity_id, to_owned, self.amount).map(|_| ())
    }

    /// The two correlated entries a committed transfer must produce.
    pub fn legs(&self, transfer_id: TransferId) -> [NewLedgerEntry; 2] {
        [
            NewLedgerEntry {
                entity_id: self.from_entity_id,
                delta: -self.amount,
                note: Some(TransferLeg::Out.note(transfer_id)),
            },
            NewLedgerEntry {
                entity_id: self.to_entity_id,
                delta: self.amount,
                note: Some(TransferLeg::In.note(transfer_id)),
            },
        ]
    }

    /// Attach the store-assigned identity.
    pub fn into_committed(self, id: TransferId, created_at: DateTime<Utc>) -> Transfer {
        Transfer {
            id,
            from_entity_id: self.from_entity_id,
            to_entity_id: self.to_entity_id,
            amount: self.amount,
            note: self.note,
            created_at,
        }
    }
}

/// A completed allowance movement between two entities (immutable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_entity_id: EntityId,
    pub to_entity_id: EntityId,
    pub amount: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn involves(&self, entity_id: EntityId) -> bool {
        self.from_entity_id == entity_id || self.to_entity_id == entity_id
    }
}

/// Sum of all deltas recorded for `entity_id`.
pub fn owned_balance<'a>(
    entity_id: EntityId,
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> f64 {
    entries
        .into_iter()
        .filter(|e| e.entity_id == entity_id)
        .map(|e| e.delta)
        .sum()
}

/// Allowance position of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllowanceSummary {
    pub entity_id: EntityId,
    pub owned: f64,
    /// Reserved for allowances pledged but not yet transferred. Always zero.
    pub committed: f64,
    pub available: f64,
}

impl AllowanceSummary {
    pub fn from_owned(entity_id: EntityId, owned: f64) -> Self {
        let committed = 0.0;
        Self {
            entity_id,
            owned,
            committed,
            available: owned - committed,
        }
    }

    pub fn derive<'a>(
        entity_id: EntityId,
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
    ) -> Self {
        Self::from_owned(entity_id, owned_balance(entity_id, entries))
    }
}

/// Result of a successful transfer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub from_balance: AllowanceSummary,
    pub to_balance: AllowanceSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entity(id: i64) -> EntityId {
        EntityId::new(id)
    }

    fn entry(id: i64, entity_id: EntityId, delta: f64) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(id),
            entity_id,
            delta,
            note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn summary_of_empty_log_is_zero() {
        let log: Vec<LedgerEntry> = Vec::new();
        let s = AllowanceSummary::derive(entity(1), &log);
        assert_eq!(s.owned, 0.0);
        assert_eq!(s.committed, 0.0);
        assert_eq!(s.available, 0.0);
    }

    #[test]
    fn summary_only_counts_the_requested_entity() {
        let log = vec![
            entry(1, entity(1), 5000.0),
            entry(2, entity(2), 300.0),
            entry(3, entity(1), -1200.0),
        ];
        let s = AllowanceSummary::derive(entity(1), &log);
        assert_eq!(s.owned, 3800.0);
        assert_eq!(s.available, 3800.0);
    }

    #[test]
    fn zero_and_negative_adjustments_are_accepted() {
        assert!(NewLedgerEntry::adjustment(entity(1), 0.0, None).is_ok());
        assert!(NewLedgerEntry::adjustment(entity(1), -10_000.0, Some("audit".into())).is_ok());
    }

    #[test]
    fn non_finite_adjustment_is_rejected() {
        let err = NewLedgerEntry::adjustment(entity(1), f64::NAN, None).unwrap_err();
        assert!(matches!(err, AllowanceError::InvalidDelta(_)));
        let err = NewLedgerEntry::adjustment(entity(1), f64::INFINITY, None).unwrap_err();
        assert!(matches!(err, AllowanceError::InvalidDelta(_)));
    }

    #[test]
    fn non_positive_transfer_amounts_are_rejected() {
        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = NewTransfer::new(entity(1), entity(2), amount, None).unwrap_err();
            assert!(matches!(err, AllowanceError::InvalidAmount(_)), "amount {amount}");
        }
    }

    #[test]
    fn self_transfer_is_rejected() {
        let err = NewTransfer::new(entity(3), entity(3), 10.0, None).unwrap_err();
        assert_eq!(err, AllowanceError::SelfTransfer(entity(3)));
    }

    #[test]
    fn coverage_check_allows_exact_balance() {
        let t = NewTransfer::new(entity(1), entity(2), 1200.0, None).unwrap();
        assert!(t.ensure_covered(1200.0).is_ok());
        let err = t.ensure_covered(1199.5).unwrap_err();
        assert_eq!(
            err,
            AllowanceError::InsufficientBalance {
                entity_id: entity(1),
                owned: 1199.5,
                requested: 1200.0,
            }
        );
    }

    #[test]
    fn adjustment_that_overflows_the_balance_is_rejected() {
        let grant = NewLedgerEntry::adjustment(entity(1), f64::MAX, None).unwrap();
        assert!(grant.ensure_applicable(0.0).is_ok());
        let err = grant.ensure_applicable(f64::MAX).unwrap_err();
        assert!(matches!(err, AllowanceError::BalanceOverflow { .. }));

        let burn = NewLedgerEntry::adjustment(entity(1), -f64::MAX, None).unwrap();
        assert!(burn.ensure_applicable(-f64::MAX).is_err());
        assert!(burn.ensure_applicable(f64::MAX).is_ok());
    }

    #[test]
    fn non_finite_balances_never_cover_a_transfer() {
        let t = NewTransfer::new(entity(1), entity(2), 1e308, None).unwrap();
        for owned in [f64::INFINITY, f64::NAN] {
            let err = t.ensure_covered(owned).unwrap_err();
            assert!(matches!(err, AllowanceError::BalanceOverflow { .. }), "owned {owned}");
        }
    }

    #[test]
    fn destination_balance_must_stay_finite() {
        let t = NewTransfer::new(entity(1), entity(2), f64::MAX, None).unwrap();
        assert!(t.ensure_receivable(0.0).is_ok());
        let err = t.ensure_receivable(f64::MAX).unwrap_err();
        assert_eq!(
            err,
            AllowanceError::BalanceOverflow {
                entity_id: entity(2),
                owned: f64::MAX,
                delta: f64::MAX,
            }
        );
    }

    #[test]
    fn legs_are_noted_with_the_transfer_id() {
        let t = NewTransfer::new(entity(1), entity(2), 1200.0, Some("Q3 settlement".into())).unwrap();
        let [out, inn] = t.legs(TransferId::new(7));
        assert_eq!(out.entity_id, entity(1));
        assert_eq!(out.delta, -1200.0);
        assert_eq!(out.note.as_deref(), Some("transfer_out:7"));
        assert_eq!(inn.entity_id, entity(2));
        assert_eq!(inn.delta, 1200.0);
        assert_eq!(inn.note.as_deref(), Some("transfer_in:7"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: owned equals the sum of the entity's deltas and available equals owned.
        #[test]
        fn owned_is_sum_of_deltas(
            deltas in prop::collection::vec((1i64..4, -10_000i64..10_000i64), 0..40)
        ) {
            let log: Vec<LedgerEntry> = deltas
                .iter()
                .enumerate()
                .map(|(i, (e, d))| entry(i as i64 + 1, entity(*e), *d as f64))
                .collect();

            for e in 1..4 {
                let expected: i64 = deltas.iter().filter(|(id, _)| *id == e).map(|(_, d)| d).sum();
                let s = AllowanceSummary::derive(entity(e), &log);
                prop_assert_eq!(s.owned, expected as f64);
                prop_assert_eq!(s.available, s.owned);
                prop_assert_eq!(s.committed, 0.0);
            }
        }

        /// Property: the two legs of any valid transfer net to zero.
        #[test]
        fn transfer_legs_conserve_allowances(amount in 1i64..1_000_000i64, id in 1i64..10_000i64) {
            let t = NewTransfer::new(entity(1), entity(2), amount as f64, None).unwrap();
            let legs = t.legs(TransferId::new(id));
            let net: f64 = legs.iter().map(|l| l.delta).sum();
            prop_assert_eq!(net, 0.0);
        }
    }
}
