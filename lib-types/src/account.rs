//! Account and balance value types.
//!
//! Pure data: balances are only ever mutated through ledger postings in
//! lib-ledger, never written directly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::primitives::{Amount, MemberId, UnixTime};

/// Balance-bearing currencies in the partner economy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Internal loyalty points earned on processed orders
    LyPoints,
    /// Cash balance in minor units (withdrawable)
    Cash,
    /// Bonus-pool participation tokens settled per payout cycle
    RwaToken,
}

impl Currency {
    /// All currencies in stable order
    pub const ALL: &'static [Currency] =
        &[Currency::LyPoints, Currency::Cash, Currency::RwaToken];

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Currency::LyPoints => "LY points",
            Currency::Cash => "cash",
            Currency::RwaToken => "RWA tokens",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Partner enrollment tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Entry tier
    Phase1,
    /// Mid tier
    Phase2,
    /// Top tier
    Phase3,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Phase1 => "phase1",
            Tier::Phase2 => "phase2",
            Tier::Phase3 => "phase3",
        };
        write!(f, "{}", name)
    }
}

/// Administrative account status
///
/// Suspended accounts cannot receive commission postings; legs targeting them
/// are recorded as blocked and resolved explicitly by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Account may receive postings
    Active,
    /// Postings to this account are withheld as blocked records
    Suspended,
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Active
    }
}

/// Snapshot of one partner's account.
///
/// Created when a member becomes a partner. `total_boxes_processed` is
/// monotonic non-decreasing; `packages_purchased` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Owning member
    pub member_id: MemberId,
    /// Current enrollment tier
    pub tier: Tier,
    /// Administrative status
    pub status: AccountStatus,
    /// Loyalty point balance
    pub ly_points: Amount,
    /// Cash balance in minor units
    pub cash_balance: Amount,
    /// Bonus-pool token balance
    pub rwa_tokens: Amount,
    /// Lifetime processed box count (monotonic)
    pub total_boxes_processed: u64,
    /// Enrollment packages purchased (>= 1)
    pub packages_purchased: u32,
    /// Account creation time, unix epoch seconds
    pub created_at: UnixTime,
}

impl Account {
    /// Create a fresh account at enrollment
    pub fn new(member_id: MemberId, tier: Tier, created_at: UnixTime) -> Self {
        Self {
            member_id,
            tier,
            status: AccountStatus::Active,
            ly_points: 0,
            cash_balance: 0,
            rwa_tokens: 0,
            total_boxes_processed: 0,
            packages_purchased: 1,
            created_at,
        }
    }

    /// Balance for one currency
    pub fn balance(&self, currency: Currency) -> Amount {
        match currency {
            Currency::LyPoints => self.ly_points,
            Currency::Cash => self.cash_balance,
            Currency::RwaToken => self.rwa_tokens,
        }
    }

    /// Whether the account may receive commission postings
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new(MemberId::new("M1"), Tier::Phase1, 1_700_000_000);
        assert!(account.is_active());
        assert_eq!(account.packages_purchased, 1);
        assert_eq!(account.total_boxes_processed, 0);
        for &currency in Currency::ALL {
            assert_eq!(account.balance(currency), 0);
        }
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::LyPoints.to_string(), "LY points");
        assert_eq!(Currency::Cash.to_string(), "cash");
        assert_eq!(Currency::RwaToken.to_string(), "RWA tokens");
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Phase1 < Tier::Phase2);
        assert!(Tier::Phase2 < Tier::Phase3);
    }

    #[test]
    fn test_serialization_round_trip() {
        let account = Account::new(MemberId::new("M9"), Tier::Phase2, 1_700_000_000);
        let json = serde_json::to_string(&account).expect("serialize failed");
        let back: Account = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(account, back);
    }
}
