// 8.0 progression.rs: tier movement policy. promotion is automatic and
// evaluated right after settlement, when capital_current is fresh; demotion
// only happens by operator action, never from a losing streak. one step per
// evaluation: an account that leaps two thresholds in a day still climbs one
// tier and gets re-evaluated next settlement.

use crate::account::{Account, AccountStatus};
use crate::tier::{TierError, TierRegistry};
use crate::types::TierId;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProgressionError {
    #[error(transparent)]
    Tier(#[from] TierError),

    #[error("Account already sits on the lowest tier {0:?}")]
    AtLowestTier(TierId),
}

/// Result of a post-settlement tier evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierEvaluation {
    pub from: TierId,
    pub to: TierId,
}

impl TierEvaluation {
    pub fn promoted(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapitalProgressionTracker;

impl CapitalProgressionTracker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an account against its tier's graduation threshold.
    ///
    /// Promotes at most one tier. Only active accounts move; paused and
    /// breached accounts keep their tier until their status is resolved.
    pub fn evaluate(
        &self,
        account: &Account,
        registry: &TierRegistry,
    ) -> Result<TierEvaluation, ProgressionError> {
        let current = registry.get(account.tier_id)?;
        let unchanged = TierEvaluation {
            from: account.tier_id,
            to: account.tier_id,
        };

        if account.status != AccountStatus::Active {
            return Ok(unchanged);
        }

        let threshold = match current.graduation_threshold() {
            Some(t) => t,
            None => return Ok(unchanged),
        };

        if account.capital_current() < threshold {
            return Ok(unchanged);
        }

        match registry.next_tier(account.tier_id) {
            Some(next) => Ok(TierEvaluation {
                from: account.tier_id,
                to: next.tier_id,
            }),
            None => Ok(unchanged),
        }
    }

    /// Operator-driven demotion to the tier directly below. Refused at the
    /// bottom of the ladder.
    pub fn demote(
        &self,
        account: &Account,
        registry: &TierRegistry,
    ) -> Result<TierEvaluation, ProgressionError> {
        registry.get(account.tier_id)?;
        let below = registry
            .prev_tier(account.tier_id)
            .ok_or(ProgressionError::AtLowestTier(account.tier_id))?;

        Ok(TierEvaluation {
            from: account.tier_id,
            to: below.tier_id,
        })
    }
}
