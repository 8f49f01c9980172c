//! Blocked commission legs.
//!
//! A leg that cannot post immediately is withheld as a record rather than
//! silently dropped, so every ancestor level of a processed event is
//! accounted for. Records resolve only through an explicit re-evaluation
//! pass ([`crate::CommissionEngine::resolve_blocked`]), never automatically.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use lib_types::{Amount, Currency, EventId, MemberId, UnixTime};

/// Why a commission leg was withheld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// Recipient account is administratively suspended
    AccountSuspended,
    /// Recipient is in the referral graph but has never enrolled as a partner
    AccountMissing,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockReason::AccountSuspended => "account suspended",
            BlockReason::AccountMissing => "account missing",
        };
        write!(f, "{}", name)
    }
}

/// A withheld commission amount awaiting explicit resolution.
///
/// Leg state machine: `Pending -> {Posted | Blocked}`, `Blocked -> Posted`
/// via resolution; a posted leg is terminal. Resolution posts with the
/// original `source_event_id`, so ledger idempotence still holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedRecord {
    /// Unique record identifier
    pub record_id: Uuid,
    /// Withheld recipient
    pub account_id: MemberId,
    /// Event whose fan-out produced this leg
    pub source_event_id: EventId,
    /// Ancestor level of the leg (1 = direct referrer)
    pub level: u32,
    /// Withheld amount
    pub amount: Amount,
    /// Withheld currency
    pub currency: Currency,
    /// Why the leg was withheld
    pub reason: BlockReason,
    /// Creation time, unix epoch seconds
    pub created_at: UnixTime,
    /// Resolution time, or None while still blocked
    pub resolved_at: Option<UnixTime>,
}

impl BlockedRecord {
    /// Whether this record has been converted into a ledger posting
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
