//! In-memory ledger and account store.
//!
//! Reference implementation of [`LedgerStore`] and [`AccountStore`] behind a
//! single `RwLock`, so a posting and its balance materialization are atomic.
//! Persistent backends would replace the lock with row-level locking or
//! compare-and-swap on the materialized balance; the trait contracts are the
//! same.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use lib_types::{now_unix, Account, AccountStatus, Amount, Currency, EventId, MemberId, Tier};

use crate::entry::{EntryKind, LedgerEntry, LedgerEntryDraft};
use crate::errors::{LedgerError, LedgerResult};
use crate::store::{AccountStore, HistoryPage, LedgerStore};

#[derive(Debug, Default)]
struct LedgerInner {
    /// Next global sequence number (strictly increasing)
    next_seq: u64,
    /// Append-only entry log in seq order
    entries: Vec<LedgerEntry>,
    /// Per account/currency index into `entries`, ascending seq
    by_account: HashMap<(MemberId, Currency), Vec<usize>>,
    /// Idempotence index: posting key -> entry index
    dedup: HashMap<(EventId, MemberId, EntryKind), usize>,
    /// Account records with materialized balances
    accounts: HashMap<MemberId, Account>,
    /// Idempotence index for counter updates, keyed like postings
    counter_dedup: HashSet<(EventId, MemberId, CounterKind)>,
}

/// Which account counter an event has already moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CounterKind {
    Enrollment,
    Boxes,
}

/// In-memory [`LedgerStore`] + [`AccountStore`].
#[derive(Debug, Default)]
pub struct MemoryLedger {
    inner: RwLock<LedgerInner>,
}

impl MemoryLedger {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries (audit/testing aid)
    pub async fn entry_count(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// JSON snapshot of one account for reporting surfaces
    pub async fn account_summary(&self, member_id: &MemberId) -> LedgerResult<serde_json::Value> {
        let inner = self.inner.read().await;
        let account = inner
            .accounts
            .get(member_id)
            .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()))?;
        Ok(serde_json::json!({
            "member_id": account.member_id.as_str(),
            "tier": account.tier.to_string(),
            "ly_points": account.ly_points,
            "cash_balance": account.cash_balance,
            "rwa_tokens": account.rwa_tokens,
            "total_boxes_processed": account.total_boxes_processed,
            "packages_purchased": account.packages_purchased,
        }))
    }
}

/// Apply a signed delta to a balance, enforcing non-negativity.
fn apply_delta(balance: Amount, delta: i64, currency: Currency) -> LedgerResult<Amount> {
    if delta >= 0 {
        balance
            .checked_add(delta as Amount)
            .ok_or(LedgerError::Overflow)
    } else {
        let need = delta.unsigned_abs();
        balance
            .checked_sub(need)
            .ok_or(LedgerError::InsufficientBalance {
                currency,
                have: balance,
                need,
            })
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn post(&self, draft: LedgerEntryDraft) -> LedgerResult<LedgerEntry> {
        if draft.amount_delta == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let mut inner = self.inner.write().await;

        let key = (
            draft.source_event_id.clone(),
            draft.account_id.clone(),
            draft.kind,
        );
        if inner.dedup.contains_key(&key) {
            return Err(LedgerError::DuplicateEvent {
                event_id: draft.source_event_id,
                account_id: draft.account_id,
                kind: draft.kind,
            });
        }

        // All checks pass before any mutation, so a rejected post leaves no trace.
        let account = inner
            .accounts
            .get_mut(&draft.account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(draft.account_id.clone()))?;
        let new_balance =
            apply_delta(account.balance(draft.currency), draft.amount_delta, draft.currency)?;
        match draft.currency {
            Currency::LyPoints => account.ly_points = new_balance,
            Currency::Cash => account.cash_balance = new_balance,
            Currency::RwaToken => account.rwa_tokens = new_balance,
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let entry = LedgerEntry {
            entry_id: Uuid::new_v4(),
            seq,
            account_id: draft.account_id.clone(),
            kind: draft.kind,
            amount_delta: draft.amount_delta,
            currency: draft.currency,
            source_event_id: draft.source_event_id,
            created_at: now_unix(),
        };

        let index = inner.entries.len();
        inner.entries.push(entry.clone());
        inner
            .by_account
            .entry((draft.account_id.clone(), draft.currency))
            .or_default()
            .push(index);
        inner.dedup.insert(key, index);

        info!(
            "posted {} {} {:+} to {} (event {}, balance now {})",
            entry.kind, entry.currency, entry.amount_delta, entry.account_id,
            entry.source_event_id, new_balance
        );
        Ok(entry)
    }

    async fn find_entry(
        &self,
        source_event_id: &EventId,
        account_id: &MemberId,
        kind: EntryKind,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        let key = (source_event_id.clone(), account_id.clone(), kind);
        Ok(inner
            .dedup
            .get(&key)
            .map(|&index| inner.entries[index].clone()))
    }

    async fn balance(&self, account_id: &MemberId, currency: Currency) -> LedgerResult<Amount> {
        let inner = self.inner.read().await;
        let account = inner
            .accounts
            .get(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount(account_id.clone()))?;
        Ok(account.balance(currency))
    }

    async fn history(
        &self,
        account_id: &MemberId,
        currency: Currency,
        cursor: Option<u64>,
        limit: usize,
    ) -> LedgerResult<HistoryPage> {
        let inner = self.inner.read().await;
        let indices = inner
            .by_account
            .get(&(account_id.clone(), currency))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // Newest first; resume strictly below the cursor seq.
        let mut entries = Vec::with_capacity(limit.min(indices.len()));
        let mut more = false;
        for &index in indices.iter().rev() {
            let entry = &inner.entries[index];
            if let Some(cursor) = cursor {
                if entry.seq >= cursor {
                    continue;
                }
            }
            if entries.len() == limit {
                more = true;
                break;
            }
            entries.push(entry.clone());
        }

        let next_cursor = if more {
            entries.last().map(|e| e.seq)
        } else {
            None
        };
        Ok(HistoryPage {
            entries,
            next_cursor,
        })
    }
}

#[async_trait]
impl AccountStore for MemoryLedger {
    async fn create_account(&self, member_id: MemberId, tier: Tier) -> LedgerResult<Account> {
        let mut inner = self.inner.write().await;
        if inner.accounts.contains_key(&member_id) {
            return Err(LedgerError::DuplicateAccount(member_id));
        }
        let account = Account::new(member_id.clone(), tier, now_unix());
        inner.accounts.insert(member_id.clone(), account.clone());
        info!("created account {} at tier {}", member_id, tier);
        Ok(account)
    }

    async fn account(&self, member_id: &MemberId) -> LedgerResult<Account> {
        let inner = self.inner.read().await;
        inner
            .accounts
            .get(member_id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()))
    }

    async fn account_exists(&self, member_id: &MemberId) -> LedgerResult<bool> {
        Ok(self.inner.read().await.accounts.contains_key(member_id))
    }

    async fn enroll(
        &self,
        member_id: &MemberId,
        tier: Tier,
        source_event_id: &EventId,
    ) -> LedgerResult<Account> {
        let mut inner = self.inner.write().await;
        let key = (
            source_event_id.clone(),
            member_id.clone(),
            CounterKind::Enrollment,
        );
        if inner.counter_dedup.contains(&key) {
            debug!(
                "enrollment event {} for {} already applied; returning current account",
                source_event_id, member_id
            );
            return inner
                .accounts
                .get(member_id)
                .cloned()
                .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()));
        }

        let account = match inner.accounts.get_mut(member_id) {
            Some(account) => {
                account.tier = tier;
                account.packages_purchased = account.packages_purchased.saturating_add(1);
                debug!(
                    "re-enrolled {} at tier {} (packages now {})",
                    member_id, tier, account.packages_purchased
                );
                account.clone()
            }
            None => {
                let account = Account::new(member_id.clone(), tier, now_unix());
                inner.accounts.insert(member_id.clone(), account.clone());
                info!("enrolled new partner {} at tier {}", member_id, tier);
                account
            }
        };
        inner.counter_dedup.insert(key);
        Ok(account)
    }

    async fn record_boxes(
        &self,
        member_id: &MemberId,
        boxes: u64,
        source_event_id: &EventId,
    ) -> LedgerResult<u64> {
        let mut inner = self.inner.write().await;
        let key = (source_event_id.clone(), member_id.clone(), CounterKind::Boxes);
        if inner.counter_dedup.contains(&key) {
            debug!(
                "box event {} for {} already applied; counter unchanged",
                source_event_id, member_id
            );
            return inner
                .accounts
                .get(member_id)
                .map(|a| a.total_boxes_processed)
                .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()));
        }

        let total = {
            let account = inner
                .accounts
                .get_mut(member_id)
                .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()))?;
            account.total_boxes_processed = account
                .total_boxes_processed
                .checked_add(boxes)
                .ok_or(LedgerError::Overflow)?;
            account.total_boxes_processed
        };
        inner.counter_dedup.insert(key);
        debug!("recorded {} boxes for {} (total {})", boxes, member_id, total);
        Ok(total)
    }

    async fn set_status(&self, member_id: &MemberId, status: AccountStatus) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .get_mut(member_id)
            .ok_or_else(|| LedgerError::UnknownAccount(member_id.clone()))?;
        account.status = status;
        info!("set status of {} to {:?}", member_id, status);
        Ok(())
    }
}
