//! Ledger errors.

use thiserror::Error;

use lib_types::{Amount, Currency, EventId, MemberId};

use crate::entry::EntryKind;

/// Error during ledger or account operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A posting with this idempotence key already exists. Recoverable:
    /// callers treat it as already-applied and may recover the original
    /// entry via `find_entry`.
    #[error("duplicate posting for event {event_id} / account {account_id} / kind {kind}")]
    DuplicateEvent {
        event_id: EventId,
        account_id: MemberId,
        kind: EntryKind,
    },

    /// Applying the delta would drive a non-negative balance below zero
    #[error("insufficient {currency} balance: have {have}, need {need}")]
    InsufficientBalance {
        currency: Currency,
        have: Amount,
        need: Amount,
    },

    #[error("account not found: {0}")]
    UnknownAccount(MemberId),

    #[error("account already exists: {0}")]
    DuplicateAccount(MemberId),

    #[error("zero amount not allowed")]
    ZeroAmount,

    #[error("arithmetic overflow")]
    Overflow,

    /// Persistence backend failure (connection loss, corrupt row, etc.)
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether this error means the posting is already applied
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::DuplicateEvent { .. })
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
