//! Ledger entry types.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use lib_types::{Currency, EventId, MemberId, SignedAmount, UnixTime};

/// Classification of a ledger posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Direct accrual (loyalty points, token grants)
    Earn,
    /// Referral commission credit
    Bonus,
    /// Balance spent inside the platform
    Spend,
    /// Cash paid out to the member
    Withdraw,
    /// Offsetting entry releasing or voiding a prior posting
    Block,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryKind::Earn => "earn",
            EntryKind::Bonus => "bonus",
            EntryKind::Spend => "spend",
            EntryKind::Withdraw => "withdraw",
            EntryKind::Block => "block",
        };
        write!(f, "{}", name)
    }
}

/// A posting request, before the store assigns identity and ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryDraft {
    /// Account to post against
    pub account_id: MemberId,
    /// Posting classification
    pub kind: EntryKind,
    /// Signed delta: credits positive, debits negative
    pub amount_delta: SignedAmount,
    /// Currency affected
    pub currency: Currency,
    /// Upstream event that caused this posting (idempotence key component)
    pub source_event_id: EventId,
}

impl LedgerEntryDraft {
    /// Credit draft (positive delta)
    pub fn credit(
        account_id: MemberId,
        kind: EntryKind,
        amount: u64,
        currency: Currency,
        source_event_id: EventId,
    ) -> Self {
        Self {
            account_id,
            kind,
            amount_delta: amount as SignedAmount,
            currency,
            source_event_id,
        }
    }

    /// Debit draft (negative delta)
    pub fn debit(
        account_id: MemberId,
        kind: EntryKind,
        amount: u64,
        currency: Currency,
        source_event_id: EventId,
    ) -> Self {
        Self {
            account_id,
            kind,
            amount_delta: -(amount as SignedAmount),
            currency,
            source_event_id,
        }
    }
}

/// An immutable, append-only ledger record.
///
/// `seq` is assigned by the store, strictly increasing across all entries,
/// and doubles as the history pagination cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier
    pub entry_id: Uuid,
    /// Store-assigned global sequence number
    pub seq: u64,
    /// Account posted against
    pub account_id: MemberId,
    /// Posting classification
    pub kind: EntryKind,
    /// Signed delta applied to the balance
    pub amount_delta: SignedAmount,
    /// Currency affected
    pub currency: Currency,
    /// Upstream event that caused this posting
    pub source_event_id: EventId,
    /// Posting time, unix epoch seconds
    pub created_at: UnixTime,
}

impl LedgerEntry {
    /// Magnitude of the delta, regardless of direction
    pub fn amount(&self) -> u64 {
        self.amount_delta.unsigned_abs()
    }

    /// Whether this entry credits the account
    pub fn is_credit(&self) -> bool {
        self.amount_delta > 0
    }
}
