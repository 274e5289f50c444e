// 7.0 config.rs: all settings in one place. tier table, volatility bands,
// regulatory limits, rail routing, rounding schedule. the whole bundle is
// versioned so a deployed engine can say exactly which parameter set it runs.
// construction goes through validated sub-types, and validate() re-runs the
// same checks after deserialization so a hand-edited file can't smuggle in a
// malformed table.

use crate::compliance::ExposureLimits;
use crate::settlement::RoundingSchedule;
use crate::tier::{Tier, TierError, TierRegistry};
use crate::transfer::RailConfig;
use crate::types::{Fraction, Leverage, Rupees, TierId};
use crate::volatility::{VolatilityCapacityModel, VolatilityError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Complete engine parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: u32,
    pub tiers: TierRegistry,
    pub bands: VolatilityCapacityModel,
    pub limits: ExposureLimits,
    pub rails: RailConfig,
    pub rounding: RoundingSchedule,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Tier(#[from] TierError),

    #[error(transparent)]
    Volatility(#[from] VolatilityError),

    #[error("Invalid limits: {reason}")]
    InvalidLimits { reason: String },

    #[error("Invalid rail config: {reason}")]
    InvalidRails { reason: String },

    #[error("Invalid rounding schedule: {reason}")]
    InvalidRounding { reason: String },
}

fn frac(v: Decimal) -> Fraction {
    Fraction::new(v).unwrap_or_else(Fraction::one)
}

fn lev(v: Decimal) -> Result<Leverage, ConfigError> {
    Leverage::new(v).ok_or(ConfigError::InvalidLimits {
        reason: format!("leverage must be >= 1, got {v}"),
    })
}

fn tier(
    id: u32,
    floor: Decimal,
    ladder: &[Decimal],
    leverage: Leverage,
    max_accounts: usize,
) -> Tier {
    Tier {
        tier_id: TierId(id),
        initial_capital: Rupees::new(floor),
        increment_ladder: ladder.iter().map(|v| Rupees::new(*v)).collect(),
        leverage_multiplier: leverage,
        max_accounts,
        fee_split_platform: frac(dec!(0.2)),
        fee_split_operator: frac(dec!(0.8)),
    }
}

impl EngineConfig {
    /// Production parameter set.
    pub fn standard() -> Result<Self, ConfigError> {
        let tiers = TierRegistry::new(
            1,
            vec![
                tier(
                    1,
                    dec!(100_000),
                    &[dec!(250_000), dec!(500_000)],
                    lev(dec!(2))?,
                    500,
                ),
                tier(
                    2,
                    dec!(250_000),
                    &[dec!(500_000), dec!(1_000_000)],
                    lev(dec!(3))?,
                    200,
                ),
                tier(3, dec!(500_000), &[], lev(dec!(5))?, 50),
            ],
        )?;

        Ok(Self {
            version: 1,
            tiers,
            bands: VolatilityCapacityModel::standard(),
            limits: ExposureLimits::default(),
            rails: RailConfig::default(),
            rounding: RoundingSchedule::standard(),
        })
    }

    /// Lower leverage and a tighter retry budget. For new deployments.
    pub fn conservative() -> Result<Self, ConfigError> {
        let mut config = Self::standard()?;
        config.tiers = TierRegistry::new(
            2,
            vec![
                tier(
                    1,
                    dec!(100_000),
                    &[dec!(250_000), dec!(500_000)],
                    lev(dec!(1.5))?,
                    200,
                ),
                tier(
                    2,
                    dec!(250_000),
                    &[dec!(500_000), dec!(1_000_000)],
                    lev(dec!(2))?,
                    100,
                ),
                tier(3, dec!(500_000), &[], lev(dec!(3))?, 25),
            ],
        )?;
        config.version = 2;
        config.rails.max_retry_rounds = 2;
        Ok(config)
    }

    /// Re-check internal consistency. Run this after deserializing a config
    /// from disk; in-process construction is already validated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // rebuild the validated sub-types to re-run their constructors
        TierRegistry::new(self.tiers.version(), self.tiers.iter().cloned().collect())?;
        VolatilityCapacityModel::new(self.bands.bands().to_vec())?;

        if self.limits.absolute_ceiling.is_zero() || self.limits.absolute_ceiling.is_negative() {
            return Err(ConfigError::InvalidLimits {
                reason: "absolute exposure ceiling must be positive".to_string(),
            });
        }
        if self.limits.max_lots.value() == 0 {
            return Err(ConfigError::InvalidLimits {
                reason: "lot ceiling must be non-zero".to_string(),
            });
        }

        if self.rails.single_rail_daily_cap.is_zero()
            || self.rails.single_rail_daily_cap.is_negative()
        {
            return Err(ConfigError::InvalidRails {
                reason: "per-rail daily cap must be positive".to_string(),
            });
        }
        if self.rails.max_retry_rounds == 0 {
            return Err(ConfigError::InvalidRails {
                reason: "at least one routing round is required".to_string(),
            });
        }

        for rule in self.rounding.rules() {
            if rule.unit.is_zero() || rule.unit.is_negative() {
                return Err(ConfigError::InvalidRounding {
                    reason: format!("rounding unit must be positive, got {}", rule.unit),
                });
            }
            if rule.unit > rule.threshold {
                return Err(ConfigError::InvalidRounding {
                    reason: format!(
                        "rounding unit {} exceeds its threshold {}",
                        rule.unit, rule.threshold
                    ),
                });
            }
        }

        Ok(())
    }
}
