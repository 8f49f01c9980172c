//! Inbound economic events.
//!
//! Produced by the external checkout/payment collaborator with at-least-once
//! delivery: the same event id may arrive more than once, and the engine must
//! treat redelivery as a no-op replay.

use serde::{Deserialize, Serialize};

use lib_types::{Amount, EventId, MemberId, Tier};

/// A completed, paid order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompleted {
    /// Upstream event id (idempotence key)
    pub event_id: EventId,
    /// Buying member
    pub member_id: MemberId,
    /// Order value in minor units (commission base)
    pub base_amount: Amount,
    /// Product boxes in the order
    pub box_count: u64,
}

/// A member purchased (or upgraded) a partner enrollment tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerEnrolled {
    /// Upstream event id (idempotence key)
    pub event_id: EventId,
    /// Enrolling member
    pub member_id: MemberId,
    /// Tier purchased
    pub tier: Tier,
    /// Enrollment price in minor units (commission base)
    pub paid_amount: Amount,
}

/// Any event the commission engine can process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommissionEvent {
    /// Order completion
    Order(OrderCompleted),
    /// Partner enrollment or upgrade
    Enrollment(PartnerEnrolled),
}

impl CommissionEvent {
    /// Idempotence key for this event
    pub fn event_id(&self) -> &EventId {
        match self {
            CommissionEvent::Order(e) => &e.event_id,
            CommissionEvent::Enrollment(e) => &e.event_id,
        }
    }

    /// Member that triggered the event
    pub fn member_id(&self) -> &MemberId {
        match self {
            CommissionEvent::Order(e) => &e.member_id,
            CommissionEvent::Enrollment(e) => &e.member_id,
        }
    }

    /// Amount the upward fan-out is computed from
    pub fn base_amount(&self) -> Amount {
        match self {
            CommissionEvent::Order(e) => e.base_amount,
            CommissionEvent::Enrollment(e) => e.paid_amount,
        }
    }
}

impl From<OrderCompleted> for CommissionEvent {
    fn from(event: OrderCompleted) -> Self {
        CommissionEvent::Order(event)
    }
}

impl From<PartnerEnrolled> for CommissionEvent {
    fn from(event: PartnerEnrolled) -> Self {
        CommissionEvent::Enrollment(event)
    }
}
