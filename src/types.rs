// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, money, fractions, leverage, lots, timestamps. each is a newtype so the compiler
// catches type mixups.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TierId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

// 1.1: rupee amount in quote currency. capital, exposure, pnl, fees all use this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rupees(Decimal);

impl Rupees {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn add(&self, other: Rupees) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Rupees) -> Self {
        Self(self.0 - other.0)
    }

    pub fn mul(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    pub fn min(&self, other: Rupees) -> Self {
        if self.0 <= other.0 {
            *self
        } else {
            other
        }
    }

    pub fn max(&self, other: Rupees) -> Self {
        if self.0 >= other.0 {
            *self
        } else {
            other
        }
    }
}

impl fmt::Display for Rupees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

impl PartialOrd for Rupees {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rupees {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, r| acc.add(r))
    }
}

impl<'a> Sum<&'a Rupees> for Rupees {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, r| acc.add(*r))
    }
}

// 1.2: a fraction in [0, 1]. fee splits and capacity fractions. the bounds
// check also runs on deserialization, so a hand-edited file cannot smuggle
// in an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Fraction(Decimal);

impl Fraction {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO && value <= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn one() -> Self {
        Self(Decimal::ONE)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn complement(&self) -> Self {
        Self(Decimal::ONE - self.0)
    }
}

impl TryFrom<Decimal> for Fraction {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Fraction::new(value).ok_or_else(|| format!("fraction out of [0, 1]: {value}"))
    }
}

impl From<Fraction> for Decimal {
    fn from(f: Fraction) -> Decimal {
        f.0
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0 * dec!(100))
    }
}

// 1.3: leverage multiplier. must be >= 1x, checked on deserialization too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Leverage(Decimal);

impl Leverage {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ONE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    // max exposure permitted against a given capital base
    pub fn exposure_ceiling(&self, capital: Rupees) -> Rupees {
        capital.mul(self.0)
    }
}

impl TryFrom<Decimal> for Leverage {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Leverage::new(value).ok_or_else(|| format!("leverage below 1x: {value}"))
    }
}

impl From<Leverage> for Decimal {
    fn from(l: Leverage) -> Decimal {
        l.0
    }
}

impl fmt::Display for Leverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

// 1.4: lot count for a proposed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lots(pub u32);

impl Lots {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Lots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lots", self.0)
    }
}

// 1.5: instrument symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.6: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rupee_arithmetic() {
        let a = Rupees::new(dec!(100_000));
        let b = Rupees::new(dec!(25_000));

        assert_eq!(a.add(b).value(), dec!(125_000));
        assert_eq!(a.sub(b).value(), dec!(75_000));
        assert_eq!(b.mul(dec!(2)).value(), dec!(50_000));
        assert!(a.sub(a.mul(dec!(2))).is_negative());
    }

    #[test]
    fn rupee_ordering_and_sum() {
        let amounts = [
            Rupees::new(dec!(10)),
            Rupees::new(dec!(20)),
            Rupees::new(dec!(30)),
        ];
        let total: Rupees = amounts.iter().sum();
        assert_eq!(total.value(), dec!(60));
        assert_eq!(amounts.iter().copied().max().unwrap().value(), dec!(30));
    }

    #[test]
    fn fraction_bounds() {
        assert!(Fraction::new(dec!(0.5)).is_some());
        assert!(Fraction::new(dec!(0)).is_some());
        assert!(Fraction::new(dec!(1)).is_some());
        assert!(Fraction::new(dec!(1.01)).is_none());
        assert!(Fraction::new(dec!(-0.1)).is_none());

        let f = Fraction::new(dec!(0.8)).unwrap();
        assert_eq!(f.complement().value(), dec!(0.2));
    }

    #[test]
    fn fraction_bounds_hold_through_deserialization() {
        assert!(serde_json::from_str::<Fraction>("\"0.5\"").is_ok());
        assert!(serde_json::from_str::<Fraction>("\"1.5\"").is_err());
        assert!(serde_json::from_str::<Fraction>("\"-0.5\"").is_err());
        assert!(serde_json::from_str::<Leverage>("\"0.5\"").is_err());

        let f = Fraction::new(dec!(0.2)).unwrap();
        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(serde_json::from_str::<Fraction>(&json).unwrap(), f);
    }

    #[test]
    fn leverage_exposure_ceiling() {
        let lev = Leverage::new(dec!(3)).unwrap();
        let ceiling = lev.exposure_ceiling(Rupees::new(dec!(1_000_000)));
        assert_eq!(ceiling.value(), dec!(3_000_000));

        assert!(Leverage::new(dec!(0.5)).is_none());
    }
}
