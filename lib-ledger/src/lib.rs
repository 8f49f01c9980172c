//! Partner network ledger.
//!
//! Durable, auditable balance state: an append-only record of every
//! balance-affecting event per account and currency. Balances are
//! materialized alongside each posting; the raw entries remain the source of
//! truth for audit and recompute.
//!
//! # Key Types
//!
//! - [`LedgerEntry`] / [`LedgerEntryDraft`]: immutable posting records
//! - [`LedgerStore`] / [`AccountStore`]: async persistence seams
//! - [`MemoryLedger`]: reference implementation of both seams
//!
//! # Contracts
//!
//! - Postings are idempotent on `(source_event_id, account_id, kind)`, and
//!   account counter updates (`enroll`, `record_boxes`) are idempotent on
//!   their source event id
//! - No posting may drive a balance below zero; violations fail, never clamp
//! - Entries are never updated or deleted; corrections are offsetting entries

pub mod entry;
pub mod errors;
pub mod memory;
pub mod store;

pub use entry::{EntryKind, LedgerEntry, LedgerEntryDraft};
pub use errors::{LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use store::{AccountStore, HistoryPage, LedgerStore};
