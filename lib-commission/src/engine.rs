//! The commission engine.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use lib_ledger::{AccountStore, EntryKind, LedgerEntry, LedgerEntryDraft, LedgerError, LedgerStore};
use lib_referral::ReferralGraph;
use lib_types::{now_unix, Amount, Currency, EventId, MemberId, Tier};

use crate::blocked::{BlockReason, BlockedRecord};
use crate::errors::{CommissionError, EngineResult};
use crate::events::CommissionEvent;
use crate::rule::CommissionRule;

/// Outcome of processing one event: the postings made, the legs withheld,
/// and whether this call was a replay of an already-processed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionResult {
    /// Processed event
    pub event_id: EventId,
    /// Ledger entries posted (commission legs plus direct accruals)
    pub postings: Vec<LedgerEntry>,
    /// Legs withheld pending explicit resolution
    pub blocked: Vec<BlockedRecord>,
    /// Ancestor levels whose leg amount floored to zero (weight table
    /// exhausted or base too small); listed so every level of the fan-out is
    /// accounted for even when nothing was posted or withheld
    pub skipped_levels: Vec<u32>,
    /// True when this event id was already processed and the stored result
    /// was returned without reposting
    pub replayed: bool,
}

impl CommissionResult {
    /// Sum of cash commission amounts posted to ancestors
    pub fn total_commission_posted(&self) -> Amount {
        self.postings
            .iter()
            .filter(|e| e.kind == EntryKind::Bonus && e.currency == Currency::Cash)
            .map(LedgerEntry::amount)
            .sum()
    }
}

#[derive(Debug, Default)]
struct EngineState {
    /// Processed-event index: prior results returned on redelivery
    processed: HashMap<EventId, CommissionResult>,
    /// All blocked records ever created, resolved or not
    blocked: HashMap<Uuid, BlockedRecord>,
}

/// Turns economic events into ledger postings and blocked records.
///
/// All collaborators are injected at construction; the engine reaches no
/// ambient globals. The internal mutex serializes fan-outs, which makes the
/// idempotence contract race-free under concurrent redelivery of the same
/// event (the spec's per-event lock, coarsened to the engine: event volume
/// is webhook-scale).
pub struct CommissionEngine {
    rule: CommissionRule,
    graph: Arc<ReferralGraph>,
    ledger: Arc<dyn LedgerStore>,
    accounts: Arc<dyn AccountStore>,
    state: Mutex<EngineState>,
}

impl CommissionEngine {
    /// Create an engine over its collaborators
    pub fn new(
        rule: CommissionRule,
        graph: Arc<ReferralGraph>,
        ledger: Arc<dyn LedgerStore>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            rule,
            graph,
            ledger,
            accounts,
            state: Mutex::new(EngineState::default()),
        }
    }

    /// The active rule configuration
    pub fn rule(&self) -> &CommissionRule {
        &self.rule
    }

    /// Process one event into postings and blocked records.
    ///
    /// Idempotent: redelivery of a processed event id returns the stored
    /// result with `replayed = true` and posts nothing. A failure mid-fan-out
    /// commits no engine state; retrying with the same event id is safe and
    /// completes the remaining legs (already-posted legs dedupe in the
    /// ledger and are treated as applied, and the account counters moved by
    /// `enroll`/`record_boxes` dedupe on the same event id in the store).
    pub async fn process(&self, event: impl Into<CommissionEvent>) -> EngineResult<CommissionResult> {
        let event = event.into();
        let mut state = self.state.lock().await;

        if let Some(prior) = state.processed.get(event.event_id()) {
            debug!("replaying already-processed event {}", event.event_id());
            let mut result = prior.clone();
            result.replayed = true;
            return Ok(result);
        }

        let member_id = event.member_id().clone();
        let event_id = event.event_id().clone();
        let mut postings = Vec::new();

        // Direct accruals for the triggering member.
        match &event {
            CommissionEvent::Order(order) => {
                // Orders require an enrolled buyer.
                match self.accounts.account(&member_id).await {
                    Ok(_) => {}
                    Err(LedgerError::UnknownAccount(id)) => {
                        return Err(CommissionError::UnknownAccount(id));
                    }
                    Err(other) => return Err(other.into()),
                }
                let points = order.box_count.saturating_mul(self.rule.ly_points_per_box);
                if points > 0 {
                    let entry = self
                        .post_or_existing(LedgerEntryDraft::credit(
                            member_id.clone(),
                            EntryKind::Earn,
                            points,
                            Currency::LyPoints,
                            event_id.clone(),
                        ))
                        .await?;
                    postings.push(entry);
                }
            }
            CommissionEvent::Enrollment(enrollment) => {
                // Registration precedes enrollment; an unregistered member is
                // an upstream data-integrity bug.
                if !self.graph.contains(&member_id).await {
                    return Err(CommissionError::UnknownAccount(member_id));
                }
                self.accounts
                    .enroll(&member_id, enrollment.tier, &event_id)
                    .await?;
                let grant = self.rule.rwa_grant(enrollment.tier);
                if grant > 0 {
                    let entry = self
                        .post_or_existing(LedgerEntryDraft::credit(
                            member_id.clone(),
                            EntryKind::Earn,
                            grant,
                            Currency::RwaToken,
                            event_id.clone(),
                        ))
                        .await?;
                    postings.push(entry);
                }
            }
        }

        // Fan the commission base up the ancestor chain.
        let ancestors = self
            .graph
            .ancestors(&member_id, self.rule.max_levels)
            .await?;
        let base_amount = event.base_amount();
        let mut blocked = Vec::new();
        let mut skipped_levels = Vec::new();

        for (level, ancestor) in &ancestors {
            let leg = self.evaluate_leg(base_amount, *level, &ancestor.member_id).await?;
            let (amount, eligibility) = match leg {
                Some(leg) => leg,
                None => {
                    // Weight table exhausted or amount floored to zero; noted
                    // in the result so the level is still auditable.
                    skipped_levels.push(*level);
                    continue;
                }
            };

            match eligibility {
                Ok(()) => {
                    let entry = self
                        .post_or_existing(LedgerEntryDraft::credit(
                            ancestor.member_id.clone(),
                            EntryKind::Bonus,
                            amount,
                            Currency::Cash,
                            event_id.clone(),
                        ))
                        .await?;
                    postings.push(entry);
                }
                Err(reason) => {
                    warn!(
                        "withholding {} cash for {} at level {} (event {}): {}",
                        amount, ancestor.member_id, level, event_id, reason
                    );
                    blocked.push(BlockedRecord {
                        record_id: Uuid::new_v4(),
                        account_id: ancestor.member_id.clone(),
                        source_event_id: event_id.clone(),
                        level: *level,
                        amount,
                        currency: Currency::Cash,
                        reason,
                        created_at: now_unix(),
                        resolved_at: None,
                    });
                }
            }
        }

        // The buyer's own threshold transition affects future events only,
        // so the counter moves after the fan-out has been computed/posted.
        if let CommissionEvent::Order(order) = &event {
            if order.box_count > 0 {
                self.accounts
                    .record_boxes(&member_id, order.box_count, &event_id)
                    .await?;
            }
        }

        let result = CommissionResult {
            event_id: event_id.clone(),
            postings,
            blocked: blocked.clone(),
            skipped_levels,
            replayed: false,
        };

        // Commit engine state only once the whole fan-out succeeded, so a
        // failed attempt leaves no half-processed event behind.
        for record in blocked {
            state.blocked.insert(record.record_id, record);
        }
        state.processed.insert(event_id.clone(), result.clone());

        info!(
            "processed event {}: {} postings, {} blocked",
            event_id,
            result.postings.len(),
            result.blocked.len()
        );
        Ok(result)
    }

    /// Re-evaluate one blocked record and post it if the condition cleared.
    ///
    /// Posts with the original `source_event_id`, so a record can never pay
    /// out twice even across crashed resolution attempts.
    pub async fn resolve_blocked(&self, record_id: Uuid) -> EngineResult<LedgerEntry> {
        let mut state = self.state.lock().await;
        let record = state
            .blocked
            .get(&record_id)
            .cloned()
            .ok_or(CommissionError::UnknownRecord(record_id))?;
        if record.is_resolved() {
            return Err(CommissionError::AlreadyResolved(record_id));
        }

        match self.accounts.account(&record.account_id).await {
            Ok(account) if account.is_active() => {}
            Ok(_) => {
                return Err(CommissionError::StillIneligible {
                    record_id,
                    reason: BlockReason::AccountSuspended,
                });
            }
            Err(LedgerError::UnknownAccount(_)) => {
                return Err(CommissionError::StillIneligible {
                    record_id,
                    reason: BlockReason::AccountMissing,
                });
            }
            Err(other) => return Err(other.into()),
        }

        let entry = self
            .post_or_existing(LedgerEntryDraft::credit(
                record.account_id.clone(),
                EntryKind::Bonus,
                record.amount,
                record.currency,
                record.source_event_id.clone(),
            ))
            .await?;

        let resolved_at = now_unix();
        if let Some(stored) = state.blocked.get_mut(&record_id) {
            stored.resolved_at = Some(resolved_at);
        }
        info!(
            "resolved blocked record {} for {}: posted {} {}",
            record_id, record.account_id, record.amount, record.currency
        );
        Ok(entry)
    }

    /// Unresolved blocked records, oldest first (the admin queue).
    pub async fn blocked_records(&self) -> Vec<BlockedRecord> {
        let state = self.state.lock().await;
        let mut records: Vec<BlockedRecord> = state
            .blocked
            .values()
            .filter(|r| !r.is_resolved())
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.created_at, r.record_id));
        records
    }

    /// Stored result for a processed event, if any.
    pub async fn processed_result(&self, event_id: &EventId) -> Option<CommissionResult> {
        self.state.lock().await.processed.get(event_id).cloned()
    }

    /// Compute one leg: amount plus eligibility verdict.
    ///
    /// Returns None when the leg carries no amount (weight table exhausted or
    /// integer floor to zero); the caller records such levels as skipped
    /// instead of posting or withholding.
    async fn evaluate_leg(
        &self,
        base_amount: Amount,
        level: u32,
        recipient: &MemberId,
    ) -> EngineResult<Option<(Amount, Result<(), BlockReason>)>> {
        let (amount, eligibility) = match self.accounts.account(recipient).await {
            Ok(account) => {
                let threshold = self.rule.box_threshold(account.packages_purchased);
                let cashback = self
                    .rule
                    .cashback_rate_pct(account.total_boxes_processed, threshold);
                let amount = self.rule.leg_amount(base_amount, account.tier, cashback, level);
                let eligibility = if account.is_active() {
                    Ok(())
                } else {
                    Err(BlockReason::AccountSuspended)
                };
                (amount, eligibility)
            }
            Err(LedgerError::UnknownAccount(_)) => {
                // Registered but never enrolled: withhold at the entry-tier,
                // below-threshold rate until the account exists.
                let amount = self.rule.leg_amount(
                    base_amount,
                    Tier::Phase1,
                    self.rule.rate_below_threshold_pct,
                    level,
                );
                (amount, Err(BlockReason::AccountMissing))
            }
            Err(other) => return Err(other.into()),
        };

        if amount == 0 {
            return Ok(None);
        }
        Ok(Some((amount, eligibility)))
    }

    /// Post a draft, treating an idempotence collision as already-applied.
    async fn post_or_existing(&self, draft: LedgerEntryDraft) -> EngineResult<LedgerEntry> {
        let key = (
            draft.source_event_id.clone(),
            draft.account_id.clone(),
            draft.kind,
        );
        match self.ledger.post(draft).await {
            Ok(entry) => Ok(entry),
            Err(err) if err.is_duplicate() => {
                debug!(
                    "leg for event {} / account {} already posted; reusing entry",
                    key.0, key.1
                );
                self.ledger
                    .find_entry(&key.0, &key.1, key.2)
                    .await?
                    .ok_or_else(|| CommissionError::Ledger(err))
            }
            Err(other) => Err(other.into()),
        }
    }
}
