//! Account tier table: capital floors, leverage, fee splits.
//!
//! Tiers are immutable per registry version. Accounts reference a `TierId`,
//! never a copy, so a registry swap re-prices everyone at once. The registry
//! is validated at construction; a malformed table never reaches the engine.

use crate::types::{Fraction, Leverage, Rupees, TierId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One tier of the progression ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tier {
    pub tier_id: TierId,
    /// Capital floor for entering this tier.
    pub initial_capital: Rupees,
    /// Ascending capital thresholds at which the account graduates to each
    /// subsequent tier. The first entry is the next graduation point.
    pub increment_ladder: Vec<Rupees>,
    pub leverage_multiplier: Leverage,
    /// Maximum concurrently open accounts permitted on this tier.
    pub max_accounts: usize,
    /// Platform share of fees on positive gross P&L.
    pub fee_split_platform: Fraction,
    /// Operator share, complement of the platform share.
    pub fee_split_operator: Fraction,
}

impl Tier {
    /// Capital threshold at which the account graduates to the next tier.
    /// `None` for the top tier.
    pub fn graduation_threshold(&self) -> Option<Rupees> {
        self.increment_ladder.first().copied()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TierError {
    #[error("Tier registry must contain at least one tier")]
    Empty,

    #[error("Duplicate tier id {0:?}")]
    DuplicateId(TierId),

    #[error("Tier {0:?} not found in registry")]
    NotFound(TierId),

    #[error("Tiers must be ordered by ascending capital floor (violated at {0:?})")]
    FloorOrdering(TierId),

    #[error("Tier {0:?}: increment ladder must be strictly ascending and above the floor")]
    LadderOrdering(TierId),

    #[error("Tier {0:?}: fee splits must sum to 1")]
    FeeSplitSum(TierId),

    #[error("Tier {0:?}: max_accounts must be non-zero")]
    ZeroAccounts(TierId),
}

/// Versioned, validated table of tiers ordered ascending by capital floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRegistry {
    version: u32,
    tiers: Vec<Tier>,
}

impl TierRegistry {
    pub fn new(version: u32, tiers: Vec<Tier>) -> Result<Self, TierError> {
        if tiers.is_empty() {
            return Err(TierError::Empty);
        }

        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].iter().any(|t| t.tier_id == tier.tier_id) {
                return Err(TierError::DuplicateId(tier.tier_id));
            }

            if i > 0 && tier.initial_capital <= tiers[i - 1].initial_capital {
                return Err(TierError::FloorOrdering(tier.tier_id));
            }

            let mut prev = tier.initial_capital;
            for step in &tier.increment_ladder {
                if *step <= prev {
                    return Err(TierError::LadderOrdering(tier.tier_id));
                }
                prev = *step;
            }

            let split_sum =
                tier.fee_split_platform.value() + tier.fee_split_operator.value();
            if split_sum != Decimal::ONE {
                return Err(TierError::FeeSplitSum(tier.tier_id));
            }

            if tier.max_accounts == 0 {
                return Err(TierError::ZeroAccounts(tier.tier_id));
            }
        }

        Ok(Self { version, tiers })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn get(&self, tier_id: TierId) -> Result<&Tier, TierError> {
        self.tiers
            .iter()
            .find(|t| t.tier_id == tier_id)
            .ok_or(TierError::NotFound(tier_id))
    }

    /// The tier directly above the given one, if any.
    pub fn next_tier(&self, tier_id: TierId) -> Option<&Tier> {
        let idx = self.tiers.iter().position(|t| t.tier_id == tier_id)?;
        self.tiers.get(idx + 1)
    }

    /// The tier directly below the given one, if any.
    pub fn prev_tier(&self, tier_id: TierId) -> Option<&Tier> {
        let idx = self.tiers.iter().position(|t| t.tier_id == tier_id)?;
        idx.checked_sub(1).and_then(|i| self.tiers.get(i))
    }

    pub fn lowest(&self) -> &Tier {
        &self.tiers[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter()
    }
}
