//! Exact decimal coin amounts.
//!
//! Daemons report amounts as JSON numbers in whole coins. Summing thousands
//! of small UTXOs in `f64` drifts, so every amount is carried as a
//! [`rust_decimal::Decimal`] and only converted to integer units (satoshi-like)
//! or to a wire float at the edges.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of decimal places used when rendering balances.
pub const DISPLAY_DECIMALS: u32 = 8;

/// A coin amount in whole-coin units, backed by an exact decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Convert an integer count of base units into a coin amount.
    ///
    /// `unit_scale` is the number of base units per coin (10^8 for most
    /// bitcoin-derived chains). A zero scale is treated as 1.
    pub fn from_units(units: u64, unit_scale: u64) -> Self {
        let scale = Decimal::from(unit_scale.max(1));
        Self(Decimal::from(units) / scale)
    }

    /// Convert to an integer count of base units.
    ///
    /// Returns `None` if the amount is negative, overflows `u64`, or has more
    /// precision than one base unit (it would lose value on the wire).
    pub fn to_units(&self, unit_scale: u64) -> Option<u64> {
        let scaled = self.0.checked_mul(Decimal::from(unit_scale.max(1)))?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.to_u64()
    }

    /// True if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Subtract, flooring at zero.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        if other.0 >= self.0 {
            Amount::ZERO
        } else {
            Amount(self.0 - other.0)
        }
    }

    /// Render with exactly eight decimal places (`"1.50000000"`).
    pub fn to_fixed8(&self) -> String {
        let mut rounded = self.0.round_dp(DISPLAY_DECIMALS);
        rounded.rescale(DISPLAY_DECIMALS);
        rounded.to_string()
    }

    /// Lossy conversion for JSON-RPC parameters, which daemons expect as numbers.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map(Amount)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + *a)
    }
}
