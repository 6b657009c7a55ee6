//! Fixed-point decimal used for gas prices and multipliers.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::Deserialize;
use thiserror::Error;

/// Number of fractional digits carried by [`Dec`].
pub const PRECISION: usize = 18;

const SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecParseError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal '{0}'")]
    Invalid(String),
    #[error("decimal '{0}' has more than 18 fractional digits")]
    TooPrecise(String),
    #[error("decimal '{0}' out of range")]
    Overflow(String),
}

/// A non-negative decimal with 18 fractional digits.
///
/// Stored as `value * 10^18` in a `U256`. Negative values cannot be
/// represented, so price and multiplier parameters are non-negative by
/// construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Dec(U256);

impl Dec {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(SCALE);

    /// Wrap an already scaled value.
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> U256 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        // u64::MAX * 10^18 < 2^128
        Self(U256::from(value) * SCALE)
    }

    pub fn from_int(value: U256) -> Option<Self> {
        value.checked_mul(SCALE).map(Self)
    }

    /// `value * 10^-prec`, e.g. `with_prec(50, 2)` is `0.5`.
    pub fn with_prec(value: u64, prec: usize) -> Option<Self> {
        if prec > PRECISION {
            return None;
        }
        let factor = U256::from(10u64).pow(U256::from(PRECISION - prec));
        U256::from(value).checked_mul(factor).map(Self)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Product truncated to 18 fractional digits.
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        Some(Self(self.0.checked_mul(rhs.0)? / SCALE))
    }

    pub fn checked_mul_int(self, rhs: U256) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn checked_quo_int(self, rhs: U256) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        Some(Self(self.0 / rhs))
    }

    /// Integer part, rounding toward zero.
    pub fn truncate(&self) -> U256 {
        self.0 / SCALE
    }

    /// Smallest integer not below the value.
    pub fn ceil(&self) -> U256 {
        let int = self.0 / SCALE;
        if (self.0 % SCALE).is_zero() {
            int
        } else {
            int + U256::from(1u64)
        }
    }
}

impl From<u64> for Dec {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / SCALE;
        let frac = u64::try_from(self.0 % SCALE).map_err(|_| fmt::Error)?;
        write!(f, "{int}.{frac:018}")
    }
}

impl FromStr for Dec {
    type Err = DecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecParseError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(DecParseError::Invalid(s.to_string()));
        }
        if frac_part.len() > PRECISION {
            return Err(DecParseError::TooPrecise(s.to_string()));
        }

        let int = U256::from_str_radix(int_part, 10)
            .map_err(|_| DecParseError::Overflow(s.to_string()))?;
        let frac = if frac_part.is_empty() {
            U256::ZERO
        } else {
            let padded = format!("{frac_part:0<width$}", width = PRECISION);
            U256::from_str_radix(&padded, 10).map_err(|_| DecParseError::Invalid(s.to_string()))?
        };

        int.checked_mul(SCALE)
            .and_then(|scaled| scaled.checked_add(frac))
            .map(Self)
            .ok_or_else(|| DecParseError::Overflow(s.to_string()))
    }
}

impl TryFrom<String> for Dec {
    type Error = DecParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
