//! Regulatory exposure gate.
//!
//! Validates a proposed position change against three ceilings: the absolute
//! exposure cap, the lot cap, and the tier leverage cap. All three checks run
//! regardless of early failure so a rejection carries the complete list of
//! violated rules. The gate sits in front of capacity sizing and fund
//! movement — nothing bypasses it. Pure and read-only, callable concurrently.

use crate::account::Account;
use crate::tier::Tier;
use crate::types::{Lots, Rupees};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fixed regulatory ceilings, independent of tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureLimits {
    /// Absolute exposure ceiling across all open positions (₹50 lakh).
    pub absolute_ceiling: Rupees,
    /// Maximum lot count per proposed trade.
    pub max_lots: Lots,
}

impl Default for ExposureLimits {
    fn default() -> Self {
        Self {
            absolute_ceiling: Rupees::new(dec!(5_000_000)),
            max_lots: Lots(1250),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ComplianceBreach {
    #[error("Proposed exposure {proposed} exceeds absolute ceiling {ceiling}")]
    AbsoluteExposureCeiling { proposed: Rupees, ceiling: Rupees },

    #[error("Proposed lot count {proposed} exceeds ceiling {ceiling}")]
    LotCeiling { proposed: Lots, ceiling: Lots },

    #[error("Proposed exposure {proposed} exceeds leverage ceiling {ceiling}")]
    LeverageCeiling { proposed: Rupees, ceiling: Rupees },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Reject(Vec<ComplianceBreach>),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

#[derive(Debug, Clone)]
pub struct ComplianceGate {
    limits: ExposureLimits,
}

impl ComplianceGate {
    pub fn new(limits: ExposureLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ExposureLimits {
        &self.limits
    }

    /// Check a proposed total exposure and lot count for an account.
    ///
    /// `proposed_exposure` is the total the book would carry after the change,
    /// not the delta. Every violated rule is collected.
    pub fn check(
        &self,
        account: &Account,
        tier: &Tier,
        proposed_exposure: Rupees,
        proposed_lots: Lots,
    ) -> GateDecision {
        let mut breaches = Vec::new();

        if proposed_exposure > self.limits.absolute_ceiling {
            breaches.push(ComplianceBreach::AbsoluteExposureCeiling {
                proposed: proposed_exposure,
                ceiling: self.limits.absolute_ceiling,
            });
        }

        if proposed_lots > self.limits.max_lots {
            breaches.push(ComplianceBreach::LotCeiling {
                proposed: proposed_lots,
                ceiling: self.limits.max_lots,
            });
        }

        let leverage_ceiling = tier
            .leverage_multiplier
            .exposure_ceiling(account.capital_current());
        if proposed_exposure > leverage_ceiling {
            breaches.push(ComplianceBreach::LeverageCeiling {
                proposed: proposed_exposure,
                ceiling: leverage_ceiling,
            });
        }

        if breaches.is_empty() {
            GateDecision::Allow
        } else {
            GateDecision::Reject(breaches)
        }
    }
}
