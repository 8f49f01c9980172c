//! Commission engine errors.

use thiserror::Error;
use uuid::Uuid;

use lib_ledger::LedgerError;
use lib_referral::ReferralError;
use lib_types::MemberId;

use crate::blocked::BlockReason;

/// Error during commission processing
#[derive(Error, Debug)]
pub enum CommissionError {
    /// The event references a member with no account (or no registration) —
    /// a data-integrity bug upstream, surfaced rather than swallowed
    #[error("unknown account: {0}")]
    UnknownAccount(MemberId),

    #[error("unknown blocked record: {0}")]
    UnknownRecord(Uuid),

    /// The record was already converted into a posting
    #[error("blocked record already resolved: {0}")]
    AlreadyResolved(Uuid),

    /// Expected outcome of a resolution attempt whose blocking condition has
    /// not cleared; the record stays blocked
    #[error("blocked record {record_id} still ineligible: {reason}")]
    StillIneligible {
        record_id: Uuid,
        reason: BlockReason,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("referral graph error: {0}")]
    Referral(#[from] ReferralError),
}

/// Result type for commission engine operations
pub type EngineResult<T> = Result<T, CommissionError>;
