//! Volatility-adaptive trading capacity.
//!
//! Maps a volatility index reading onto a capacity profile: what fraction of
//! the tier's nominal size may trade, the target daily return, and the win
//! rate band expected at that regime. Bands partition the whole index domain
//! `[0, ∞)` — contiguity is checked at construction so a gap can never
//! surface as a runtime miss. Pure and read-only, safe to call at any rate.

use crate::types::Fraction;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// What a volatility regime permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProfile {
    /// Fraction of nominal trading size permitted. In (0, 1].
    pub capacity_fraction: Fraction,
    /// Target daily return at this regime.
    pub target_return_pct: Fraction,
    /// Expected win-rate band (low, high).
    pub win_rate_range: (Fraction, Fraction),
}

/// One volatility band: `(lower, upper]`, the top band open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityBand {
    pub lower: Decimal,
    /// `None` marks the open-ended top band.
    pub upper: Option<Decimal>,
    pub profile: CapacityProfile,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum VolatilityError {
    #[error("Band table must contain at least one band")]
    Empty,

    #[error("First band must start at index 0, got {0}")]
    DomainStart(Decimal),

    #[error("Band boundary gap or overlap: band ending at {prev_upper} followed by band starting at {next_lower}")]
    Discontinuity {
        prev_upper: Decimal,
        next_lower: Decimal,
    },

    #[error("Only the last band may be open-ended")]
    PrematureOpenEnd,

    #[error("Top band must be open-ended, found upper bound {0}")]
    BoundedTop(Decimal),

    #[error("Capacity fraction must be in (0, 1], got {0}")]
    ZeroCapacity(Decimal),

    #[error("Volatility index must be non-negative, got {0}")]
    NegativeIndex(Decimal),
}

/// First-match band lookup over a validated partition of `[0, ∞)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityCapacityModel {
    bands: Vec<VolatilityBand>,
}

impl VolatilityCapacityModel {
    pub fn new(bands: Vec<VolatilityBand>) -> Result<Self, VolatilityError> {
        let last = bands.len().checked_sub(1).ok_or(VolatilityError::Empty)?;

        if !bands[0].lower.is_zero() {
            return Err(VolatilityError::DomainStart(bands[0].lower));
        }

        for (i, band) in bands.iter().enumerate() {
            if band.profile.capacity_fraction.is_zero() {
                return Err(VolatilityError::ZeroCapacity(
                    band.profile.capacity_fraction.value(),
                ));
            }

            match band.upper {
                Some(upper) => {
                    if i == last {
                        return Err(VolatilityError::BoundedTop(upper));
                    }
                    let next_lower = bands[i + 1].lower;
                    if next_lower != upper {
                        return Err(VolatilityError::Discontinuity {
                            prev_upper: upper,
                            next_lower,
                        });
                    }
                }
                None => {
                    if i != last {
                        return Err(VolatilityError::PrematureOpenEnd);
                    }
                }
            }
        }

        Ok(Self { bands })
    }

    /// The four-regime table from the production risk desk.
    pub fn standard() -> Self {
        fn frac(v: Decimal) -> Fraction {
            Fraction::new(v).unwrap_or_else(Fraction::one)
        }

        let bands = vec![
            VolatilityBand {
                lower: dec!(0),
                upper: Some(dec!(15)),
                profile: CapacityProfile {
                    capacity_fraction: frac(dec!(1.0)),
                    target_return_pct: frac(dec!(0.10)),
                    win_rate_range: (frac(dec!(0.60)), frac(dec!(0.66))),
                },
            },
            VolatilityBand {
                lower: dec!(15),
                upper: Some(dec!(20)),
                profile: CapacityProfile {
                    capacity_fraction: frac(dec!(0.75)),
                    target_return_pct: frac(dec!(0.08)),
                    win_rate_range: (frac(dec!(0.55)), frac(dec!(0.60))),
                },
            },
            VolatilityBand {
                lower: dec!(20),
                upper: Some(dec!(30)),
                profile: CapacityProfile {
                    capacity_fraction: frac(dec!(0.50)),
                    target_return_pct: frac(dec!(0.07)),
                    win_rate_range: (frac(dec!(0.50)), frac(dec!(0.55))),
                },
            },
            VolatilityBand {
                lower: dec!(30),
                upper: None,
                profile: CapacityProfile {
                    capacity_fraction: frac(dec!(0.50)),
                    target_return_pct: frac(dec!(0.05)),
                    win_rate_range: (frac(dec!(0.45)), frac(dec!(0.50))),
                },
            },
        ];

        // the table above is a valid partition by construction
        Self { bands }
    }

    /// Resolve the capacity profile for a volatility index reading.
    ///
    /// First-match over ascending bands; the top band catches everything
    /// above its lower bound. Exactly one band matches any non-negative
    /// reading.
    pub fn capacity_for(&self, index: Decimal) -> Result<CapacityProfile, VolatilityError> {
        if index < Decimal::ZERO {
            return Err(VolatilityError::NegativeIndex(index));
        }

        for band in &self.bands {
            match band.upper {
                Some(upper) if index <= upper => return Ok(band.profile),
                Some(_) => continue,
                None => return Ok(band.profile),
            }
        }

        // unreachable: construction guarantees an open-ended top band
        Err(VolatilityError::Empty)
    }

    pub fn bands(&self) -> &[VolatilityBand] {
        &self.bands
    }
}
