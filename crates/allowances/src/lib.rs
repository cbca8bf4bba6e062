//! EU-ETS allowance module (append-only ledger, derived balances).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod ledger;

pub use ledger::{
    AllowanceError, AllowanceSummary, LedgerEntry, NewLedgerEntry, NewTransfer, Transfer,
    TransferLeg, TransferReceipt, owned_balance,
};
