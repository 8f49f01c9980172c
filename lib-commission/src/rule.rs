//! Commission rule configuration and leg-amount math.
//!
//! All calculations use integer arithmetic over a `u128` intermediate with a
//! single flooring division, so results are deterministic across platforms
//! and never drift from floating-point rounding.

use serde::{Deserialize, Serialize};

use lib_types::{Amount, Bps, Tier};

/// Default per-level weight table in basis points, level 1 first.
///
/// Level 1 (direct referrer) carries 8%, level 2 carries 3%, decaying to
/// 0.1% at level 10. Levels beyond the table carry no weight.
pub const DEFAULT_LEVEL_WEIGHTS_BPS: &[Bps] = &[800, 300, 200, 150, 100, 80, 60, 40, 20, 10];

/// Cashback rate below the box threshold (percent)
pub const DEFAULT_RATE_BELOW_THRESHOLD_PCT: u16 = 50;

/// Cashback rate at or above the box threshold (percent)
pub const DEFAULT_RATE_AT_THRESHOLD_PCT: u16 = 30;

/// Boxes per purchased enrollment package; a member's threshold is
/// `packages_purchased * DEFAULT_BOXES_PER_PACKAGE`
pub const DEFAULT_BOXES_PER_PACKAGE: u64 = 5;

/// Loyalty points credited per processed box
pub const DEFAULT_LY_POINTS_PER_BOX: Amount = 10;

/// Commission configuration (not runtime state).
///
/// # Invariants
///
/// - `rate_at_threshold_pct <= rate_below_threshold_pct <= 100`
/// - every level weight `<= 10_000` bps
/// - the fan-out is bounded by `max_levels` regardless of table length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRule {
    /// Bound on the upward fan-out
    pub max_levels: u32,
    /// Per-level weights in basis points, level 1 first; missing levels
    /// carry zero weight
    pub level_weights_bps: Vec<Bps>,
    /// Cashback rate while the recipient is below their box threshold
    pub rate_below_threshold_pct: u16,
    /// Cashback rate once the recipient reaches their box threshold
    pub rate_at_threshold_pct: u16,
    /// Boxes per enrollment package (threshold scaling)
    pub boxes_per_package: u64,
    /// Loyalty points credited to the buyer per processed box
    pub ly_points_per_box: Amount,
    /// Per-tier base rate in percent, indexed phase1..phase3 (100 = pass-through)
    pub tier_rates_pct: [u16; 3],
    /// Bonus-pool tokens granted at enrollment, indexed phase1..phase3
    pub rwa_grants: [Amount; 3],
}

impl Default for CommissionRule {
    fn default() -> Self {
        Self {
            max_levels: 10,
            level_weights_bps: DEFAULT_LEVEL_WEIGHTS_BPS.to_vec(),
            rate_below_threshold_pct: DEFAULT_RATE_BELOW_THRESHOLD_PCT,
            rate_at_threshold_pct: DEFAULT_RATE_AT_THRESHOLD_PCT,
            boxes_per_package: DEFAULT_BOXES_PER_PACKAGE,
            ly_points_per_box: DEFAULT_LY_POINTS_PER_BOX,
            tier_rates_pct: [100, 100, 100],
            rwa_grants: [1, 3, 10],
        }
    }
}

fn tier_index(tier: Tier) -> usize {
    match tier {
        Tier::Phase1 => 0,
        Tier::Phase2 => 1,
        Tier::Phase3 => 2,
    }
}

impl CommissionRule {
    /// Check configuration invariants
    pub fn is_valid(&self) -> bool {
        self.rate_at_threshold_pct <= self.rate_below_threshold_pct
            && self.rate_below_threshold_pct <= 100
            && self.tier_rates_pct.iter().all(|&r| r <= 100)
            && self.level_weights_bps.iter().all(|&w| w <= 10_000)
    }

    /// Weight for one level (1-based); zero beyond the table
    pub fn weight_bps(&self, level: u32) -> Bps {
        if level == 0 {
            return 0;
        }
        self.level_weights_bps
            .get((level - 1) as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Box threshold for a member who purchased `packages` packages
    pub fn box_threshold(&self, packages: u32) -> u64 {
        self.boxes_per_package.saturating_mul(packages as u64)
    }

    /// Effective cashback rate given processed boxes vs threshold.
    ///
    /// The threshold itself counts as "at/above": the comparison is `>=`.
    pub fn cashback_rate_pct(&self, total_boxes: u64, threshold: u64) -> u16 {
        if total_boxes >= threshold {
            self.rate_at_threshold_pct
        } else {
            self.rate_below_threshold_pct
        }
    }

    /// Base rate for a tier in percent
    pub fn tier_rate_pct(&self, tier: Tier) -> u16 {
        self.tier_rates_pct[tier_index(tier)]
    }

    /// Bonus-pool tokens granted for an enrollment at this tier
    pub fn rwa_grant(&self, tier: Tier) -> Amount {
        self.rwa_grants[tier_index(tier)]
    }

    /// Payout amount for one commission leg.
    ///
    /// `floor(base * tier_rate * cashback_rate * weight_L)` as one division:
    /// `base * tier_pct * cashback_pct * weight_bps / (100 * 100 * 10_000)`.
    pub fn leg_amount(
        &self,
        base_amount: Amount,
        tier: Tier,
        cashback_pct: u16,
        level: u32,
    ) -> Amount {
        let weight = self.weight_bps(level);
        if weight == 0 {
            return 0;
        }
        let numerator = base_amount as u128
            * self.tier_rate_pct(tier) as u128
            * cashback_pct as u128
            * weight as u128;
        (numerator / (100u128 * 100 * 10_000)) as Amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_is_valid() {
        assert!(CommissionRule::default().is_valid());
    }

    #[test]
    fn test_worked_example_amounts() {
        // baseAmount 10000, 50% cashback, level-1 weight 0.08, level-2 0.03.
        let rule = CommissionRule::default();
        assert_eq!(rule.leg_amount(10_000, Tier::Phase1, 50, 1), 400);
        assert_eq!(rule.leg_amount(10_000, Tier::Phase1, 50, 2), 150);
    }

    #[test]
    fn test_threshold_tie_break_is_at_or_above() {
        let rule = CommissionRule::default();
        let threshold = rule.box_threshold(1);
        assert_eq!(threshold, 5);
        assert_eq!(rule.cashback_rate_pct(threshold - 1, threshold), 50);
        // Exactly at the threshold takes the lower rate.
        assert_eq!(rule.cashback_rate_pct(threshold, threshold), 30);
        assert_eq!(rule.cashback_rate_pct(threshold + 1, threshold), 30);
    }

    #[test]
    fn test_threshold_scales_with_packages() {
        let rule = CommissionRule::default();
        assert_eq!(rule.box_threshold(3), 15);
    }

    #[test]
    fn test_weight_beyond_table_is_zero() {
        let rule = CommissionRule::default();
        assert_eq!(rule.weight_bps(10), 10);
        assert_eq!(rule.weight_bps(11), 0);
        assert_eq!(rule.weight_bps(0), 0);
        assert_eq!(rule.leg_amount(1_000_000, Tier::Phase1, 50, 11), 0);
    }

    #[test]
    fn test_leg_amount_floors() {
        let rule = CommissionRule::default();
        // 999 * 100% * 50% * 8% = 39.96 -> 39
        assert_eq!(rule.leg_amount(999, Tier::Phase1, 50, 1), 39);
    }

    #[test]
    fn test_leg_amount_large_base_no_overflow() {
        let rule = CommissionRule::default();
        let amount = rule.leg_amount(u64::MAX, Tier::Phase3, 50, 1);
        assert_eq!(amount, (u64::MAX as u128 * 50 * 800 / 1_000_000u128) as u64);
    }

    #[test]
    fn test_invalid_rules_detected() {
        let mut rule = CommissionRule::default();
        rule.rate_at_threshold_pct = 60; // above the below-threshold rate
        assert!(!rule.is_valid());

        let mut rule = CommissionRule::default();
        rule.level_weights_bps[0] = 10_001;
        assert!(!rule.is_valid());
    }

    #[test]
    fn test_tier_grants() {
        let rule = CommissionRule::default();
        assert_eq!(rule.rwa_grant(Tier::Phase1), 1);
        assert_eq!(rule.rwa_grant(Tier::Phase3), 10);
    }
}
