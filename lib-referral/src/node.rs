//! Referral node type.

use serde::{Deserialize, Serialize};

use lib_types::{MemberId, UnixTime};

/// One member's position in the referral forest.
///
/// `referrer_id` is a weak back-reference, not ownership; None marks a root.
/// It is immutable once the node is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralNode {
    /// The member this node represents
    pub member_id: MemberId,
    /// The member who referred them, if any
    pub referrer_id: Option<MemberId>,
    /// Registration time, unix epoch seconds
    pub created_at: UnixTime,
}

impl ReferralNode {
    /// Whether this node is a root of the forest
    pub fn is_root(&self) -> bool {
        self.referrer_id.is_none()
    }
}
