//! Partner network primitives.
//! Stable, framework-neutral, behavior-free.
//!
//! Calculation and posting behavior lives in lib-ledger / lib-commission;
//! this crate only defines the value types they exchange.

pub mod account;
pub mod primitives;

pub use account::{Account, AccountStatus, Currency, Tier};
pub use primitives::{now_unix, Amount, Bps, EventId, MemberId, SignedAmount, UnixTime};
