//! Ledger and account persistence seams.
//!
//! These traits define the minimal storage interface needed by the commission
//! engine and the (external) member/admin surfaces. Implementations decide
//! durability; [`crate::MemoryLedger`] is the in-process reference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lib_types::{Account, AccountStatus, Amount, Currency, EventId, MemberId, Tier};

use crate::entry::{EntryKind, LedgerEntry, LedgerEntryDraft};
use crate::errors::LedgerResult;

/// One page of ledger history, newest first.
///
/// `next_cursor` is the `seq` of the last entry in this page; passing it back
/// resumes with strictly older entries, so pagination is stable even while
/// new entries are appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPage {
    /// Entries in this page, newest first
    pub entries: Vec<LedgerEntry>,
    /// Cursor for the next (older) page, or None when exhausted
    pub next_cursor: Option<u64>,
}

/// Append-only posting store with materialized balances.
///
/// # Contracts
///
/// - `post` is atomic per `(account, currency)`: concurrent posts to the same
///   account serialize, so the non-negativity and idempotence checks are
///   race-free. The store emits no events; downstream reaction is the
///   caller's responsibility.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append a posting.
    ///
    /// Fails with `DuplicateEvent` if an entry with the same
    /// `(source_event_id, account_id, kind)` already exists, and with
    /// `InsufficientBalance` if the delta would drive the balance negative.
    async fn post(&self, draft: LedgerEntryDraft) -> LedgerResult<LedgerEntry>;

    /// Look up an existing posting by idempotence key.
    ///
    /// Lets at-least-once callers treat `DuplicateEvent` as already-applied
    /// and recover the original entry.
    async fn find_entry(
        &self,
        source_event_id: &EventId,
        account_id: &MemberId,
        kind: EntryKind,
    ) -> LedgerResult<Option<LedgerEntry>>;

    /// Materialized balance for one account and currency.
    async fn balance(&self, account_id: &MemberId, currency: Currency) -> LedgerResult<Amount>;

    /// Ledger history for one account and currency, newest first.
    ///
    /// `cursor` is the `next_cursor` from a prior page, or None for the
    /// newest page. `limit` caps the page size.
    async fn history(
        &self,
        account_id: &MemberId,
        currency: Currency,
        cursor: Option<u64>,
        limit: usize,
    ) -> LedgerResult<HistoryPage>;
}

/// Account registry seam.
///
/// Balances on the returned snapshots are materialized from ledger postings;
/// the only direct mutations are the enrollment counters and administrative
/// status, which are ledger-adjacent rather than balance-affecting.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account at first enrollment.
    ///
    /// Fails with `DuplicateAccount` if one already exists.
    async fn create_account(&self, member_id: MemberId, tier: Tier) -> LedgerResult<Account>;

    /// Snapshot of one account with live balances.
    async fn account(&self, member_id: &MemberId) -> LedgerResult<Account>;

    /// Whether an account exists.
    async fn account_exists(&self, member_id: &MemberId) -> LedgerResult<bool>;

    /// Apply an enrollment: create the account if missing, otherwise set the
    /// tier and increment `packages_purchased`.
    ///
    /// Applied at most once per `source_event_id`; a redelivered event id
    /// returns the current account unchanged, so at-least-once callers can
    /// retry a failed flow without double-counting the package.
    async fn enroll(
        &self,
        member_id: &MemberId,
        tier: Tier,
        source_event_id: &EventId,
    ) -> LedgerResult<Account>;

    /// Add processed boxes to the lifetime counter (monotonic).
    ///
    /// Applied at most once per `source_event_id`, like `enroll`; a replay
    /// returns the current total without moving it.
    async fn record_boxes(
        &self,
        member_id: &MemberId,
        boxes: u64,
        source_event_id: &EventId,
    ) -> LedgerResult<u64>;

    /// Set the administrative status.
    async fn set_status(&self, member_id: &MemberId, status: AccountStatus) -> LedgerResult<()>;
}
