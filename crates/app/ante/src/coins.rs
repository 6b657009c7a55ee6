//! Coin amounts in a denomination.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::Deserialize;
use thiserror::Error;

use crate::math::{Dec, DecParseError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinParseError {
    #[error("invalid coin expression '{0}'")]
    Invalid(String),
    #[error("invalid denom '{0}'")]
    InvalidDenom(String),
    #[error(transparent)]
    Amount(#[from] DecParseError),
}

/// Denoms start with a letter, are 3..=128 characters long and use
/// `[a-zA-Z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> Result<(), CoinParseError> {
    let valid_len = (3..=128).contains(&denom.len());
    let starts_with_letter = denom.starts_with(|c: char| c.is_ascii_alphabetic());
    let valid_chars = denom
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if valid_len && starts_with_letter && valid_chars {
        Ok(())
    } else {
        Err(CoinParseError::InvalidDenom(denom.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    pub denom: String,
    pub amount: U256,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<U256>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A normalized set of coins: sorted by denom, one entry per denom and no
/// zero amounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Normalize `coins`, merging duplicate denoms. Returns `None` if a
    /// merged amount overflows.
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Option<Self> {
        let mut merged: BTreeMap<String, U256> = BTreeMap::new();
        for coin in coins {
            let entry = merged.entry(coin.denom).or_default();
            *entry = entry.checked_add(coin.amount)?;
        }
        Some(Self(
            merged
                .into_iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(denom, amount)| Coin { denom, amount })
                .collect(),
        ))
    }

    pub fn single(denom: impl Into<String>, amount: impl Into<U256>) -> Self {
        let coin = Coin::new(denom, amount);
        if coin.is_zero() {
            Self::default()
        } else {
            Self(vec![coin])
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> U256 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or_default()
    }

    /// True if, for at least one coin of `other`, `self` holds as much.
    pub fn is_any_gte(&self, other: &Coins) -> bool {
        other.iter().any(|c| self.amount_of(&c.denom) >= c.amount)
    }

    /// True if `self` holds at least every coin of `other`.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }

    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        Coins::new(self.0.iter().chain(other.0.iter()).cloned())
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// A decimal amount of a denom, used for gas prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for DecCoin {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| CoinParseError::Invalid(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(CoinParseError::Invalid(s.to_string()));
        }
        validate_denom(denom)?;
        Ok(Self {
            denom: denom.to_string(),
            amount: amount.parse()?,
        })
    }
}

/// Gas prices per denom, sorted and without zero entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn new(coins: impl IntoIterator<Item = DecCoin>) -> Self {
        let mut merged: BTreeMap<String, Dec> = BTreeMap::new();
        for coin in coins {
            let entry = merged.entry(coin.denom).or_default();
            *entry = entry.checked_add(coin.amount).unwrap_or(Dec::from_raw(U256::MAX));
        }
        Self(
            merged
                .into_iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(denom, amount)| DecCoin { denom, amount })
                .collect(),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecCoin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or_default()
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(","))
    }
}

impl FromStr for DecCoins {
    type Err = CoinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let coins = s
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<DecCoin>, _>>()?;
        Ok(Self::new(coins))
    }
}

impl TryFrom<String> for DecCoins {
    type Error = CoinParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coins_normalize() {
        let coins = Coins::new(vec![
            Coin::new("stake", U256::from(5u64)),
            Coin::new("aevm", U256::from(1u64)),
            Coin::new("aevm", U256::from(2u64)),
            Coin::new("zero", U256::ZERO),
        ])
        .unwrap();

        assert_eq!(coins.to_string(), "3aevm,5stake");
        assert_eq!(coins.amount_of("aevm"), U256::from(3u64));
        assert_eq!(coins.amount_of("missing"), U256::ZERO);
    }

    #[test]
    fn test_any_and_all_gte() {
        let have = Coins::single("aevm", U256::from(10u64));
        let need = Coins::new(vec![
            Coin::new("aevm", U256::from(10u64)),
            Coin::new("stake", U256::from(1u64)),
        ])
        .unwrap();

        assert!(have.is_any_gte(&need));
        assert!(!have.is_all_gte(&need));
        assert!(!have.is_any_gte(&Coins::default()));
    }

    #[test]
    fn test_parse_dec_coins() {
        let prices: DecCoins = "0.5aevm,1stake".parse().unwrap();
        assert_eq!(prices.amount_of("aevm"), "0.5".parse().unwrap());
        assert_eq!(prices.amount_of("stake"), Dec::ONE);
        assert!("".parse::<DecCoins>().unwrap().is_zero());
    }

    #[test]
    fn test_parse_rejects_bad_denom() {
        assert!(matches!(
            "1.0a".parse::<DecCoin>(),
            Err(CoinParseError::InvalidDenom(_))
        ));
        assert!(matches!(
            "aevm".parse::<DecCoin>(),
            Err(CoinParseError::Invalid(_))
        ));
    }
}
