//! Partner referral graph.
//!
//! A forest of member nodes linked by a single immutable `referrer` pointer.
//! Supports insertion with cycle prevention, bounded ancestor walks (used by
//! the commission fan-out), and breadth-first descendant paging that external
//! tree views can resume one level at a time.
//!
//! # Invariants
//!
//! - The referrer relation is acyclic: no member is ever its own ancestor
//! - A referrer pointer is set at most once; re-parenting is rejected
//! - Every walk is hop-bounded, so corrupt data cannot loop forever

pub mod errors;
pub mod graph;
pub mod node;

pub use errors::{ReferralError, ReferralResult};
pub use graph::{DescendantCursor, DescendantsPage, ReferralGraph, MAX_ANCESTOR_HOPS};
pub use node::ReferralNode;
