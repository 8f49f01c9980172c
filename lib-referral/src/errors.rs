//! Referral graph errors.

use thiserror::Error;

use lib_types::MemberId;

/// Error during referral graph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralError {
    /// Inserting this edge would make the member its own ancestor
    #[error("cycle detected: {member_id} is an ancestor of proposed referrer {referrer_id}")]
    CycleDetected {
        member_id: MemberId,
        referrer_id: MemberId,
    },

    /// The member is already registered; referrer pointers are immutable
    #[error("member already registered: {0}")]
    DuplicateMember(MemberId),

    #[error("referrer not found: {0}")]
    UnknownReferrer(MemberId),

    #[error("member not found: {0}")]
    UnknownMember(MemberId),

    /// An ancestor walk exceeded the hop bound; the stored edges are corrupt
    #[error("ancestor walk from {0} exceeded hop bound")]
    HopBoundExceeded(MemberId),
}

/// Result type for referral graph operations
pub type ReferralResult<T> = Result<T, ReferralError>;
