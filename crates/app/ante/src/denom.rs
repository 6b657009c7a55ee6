//! The EVM coin and the two views of its balance.
//!
//! Balances live once, in the bank ledger, in the base denom. The EVM sees
//! every amount with 18 decimals; the view is derived by scaling with a
//! fixed conversion factor and is never stored.

use alloy_primitives::U256;
use serde::Deserialize;

use crate::coins::{validate_denom, Coin};
use crate::math::Dec;

/// Decimals of the EVM representation.
pub const EVM_DECIMALS: u8 = 18;

/// Description of the coin used as EVM gas token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvmCoinInfo {
    /// Bank denom balances are kept in.
    pub denom: String,
    /// Denom of the 18-decimal representation.
    pub extended_denom: String,
    /// Decimals of the bank denom, `1..=18`.
    pub decimals: u8,
}

impl EvmCoinInfo {
    pub fn new(denom: impl Into<String>, extended_denom: impl Into<String>, decimals: u8) -> Self {
        Self {
            denom: denom.into(),
            extended_denom: extended_denom.into(),
            decimals,
        }
    }

    /// An 18-decimal coin whose bank and EVM denoms coincide.
    pub fn eighteen_decimals(denom: impl Into<String>) -> Self {
        let denom = denom.into();
        Self::new(denom.clone(), denom, EVM_DECIMALS)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.decimals == 0 || self.decimals > EVM_DECIMALS {
            return Err(format!("received unsupported decimals: {}", self.decimals));
        }
        validate_denom(&self.denom).map_err(|e| e.to_string())?;
        validate_denom(&self.extended_denom).map_err(|e| e.to_string())?;
        if self.decimals == EVM_DECIMALS && self.denom != self.extended_denom {
            return Err(
                "EVM coin denom and extended denom must be the same for 18 decimals".to_string(),
            );
        }
        Ok(())
    }

    /// `10^(18 - decimals)`.
    pub fn conversion_factor(&self) -> U256 {
        let exp = EVM_DECIMALS.saturating_sub(self.decimals);
        U256::from(10u64).pow(U256::from(exp))
    }

    /// Bank amount to EVM amount.
    pub fn to_evm(&self, bank_amount: U256) -> U256 {
        bank_amount.saturating_mul(self.conversion_factor())
    }

    /// EVM amount to bank amount, dropping any sub-unit remainder.
    pub fn from_evm(&self, evm_amount: U256) -> U256 {
        evm_amount / self.conversion_factor()
    }

    /// EVM amount to bank amount, rounding a sub-unit remainder up so a
    /// charge is never under-collected.
    pub fn from_evm_ceil(&self, evm_amount: U256) -> U256 {
        let factor = self.conversion_factor();
        let whole = evm_amount / factor;
        if (evm_amount % factor).is_zero() {
            whole
        } else {
            whole.saturating_add(U256::from(1u64))
        }
    }

    /// Bank-denominated decimal (a gas price) in EVM units.
    pub fn dec_to_evm(&self, amount: Dec) -> Dec {
        amount
            .checked_mul_int(self.conversion_factor())
            .unwrap_or(Dec::from_raw(U256::MAX))
    }

    /// An EVM amount as a bank coin, rounded up.
    pub fn bank_coin_for_evm_amount(&self, evm_amount: U256) -> Coin {
        Coin::new(self.denom.clone(), self.from_evm_ceil(evm_amount))
    }
}
