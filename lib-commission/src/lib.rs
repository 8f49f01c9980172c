//! Partner commission engine.
//!
//! Turns one economic event (order completion, partner enrollment) into zero
//! or more ledger postings plus blocked records: it walks the referral graph
//! upward a bounded number of levels, computes tiered payouts per level with
//! deterministic integer math, and posts them to the ledger as a single
//! logical operation.
//!
//! # Contracts
//!
//! - `process` is idempotent per event id: redelivery returns the prior
//!   result, with no new postings
//! - A fan-out never partially commits; any unexpected failure leaves the
//!   system safe for a full retry with the same event id
//! - Every eligible ancestor level yields either a posting or a blocked
//!   record, never a silent skip

pub mod blocked;
pub mod engine;
pub mod errors;
pub mod events;
pub mod rule;

pub use blocked::{BlockReason, BlockedRecord};
pub use engine::{CommissionEngine, CommissionResult};
pub use errors::{CommissionError, EngineResult};
pub use events::{CommissionEvent, OrderCompleted, PartnerEnrolled};
pub use rule::{CommissionRule, DEFAULT_LEVEL_WEIGHTS_BPS};
