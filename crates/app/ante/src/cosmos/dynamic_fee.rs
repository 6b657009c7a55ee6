//! EIP-1559 fee checking for native transactions.
//!
//! Once London is active and the base fee is enabled, a native transaction
//! must pay at least the base fee per gas, the same floor an Ethereum
//! transaction pays. The fee charged is the effective gas price times the
//! gas limit. The tip above the base fee is uncapped unless the
//! transaction carries an [`ExtensionOptionDynamicFeeTx`].

use std::sync::Arc;

use alloy_primitives::U256;
use tracing::trace;

use crate::coins::Coins;
use crate::context::AnteContext;
use crate::cosmos::fee::{check_tx_fee_with_validator_min_gas_prices, TxFeeChecker};
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::keepers::{EvmKeeper, ExtensionOptionChecker, FeeMarketKeeper};
use crate::math::Dec;
use crate::tx::{ExtensionOption, Tx, DYNAMIC_FEE_EXTENSION_TYPE_URL};

/// Caps the gas price a native transaction pays above the base fee.
///
/// Encoded as the raw 18-decimal value in 32 big-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionOptionDynamicFeeTx {
    /// In the bank denom.
    pub max_priority_price: Dec,
}

impl ExtensionOptionDynamicFeeTx {
    pub fn new(max_priority_price: Dec) -> Self {
        Self { max_priority_price }
    }

    pub fn decode(value: &[u8]) -> AnteResult<Self> {
        let raw: [u8; 32] = value.try_into().map_err(|_| {
            AnteError::invalid_request(format!(
                "dynamic fee extension option must be 32 bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self::new(Dec::from_raw(U256::from_be_bytes(raw))))
    }

    pub fn encode(&self) -> Vec<u8> {
        self.max_priority_price.raw().to_be_bytes::<32>().to_vec()
    }

    pub fn to_extension_option(&self) -> ExtensionOption {
        ExtensionOption {
            type_url: DYNAMIC_FEE_EXTENSION_TYPE_URL.to_string(),
            value: self.encode(),
        }
    }

    /// The first dynamic fee option carried by `tx`.
    pub fn from_tx(tx: &Tx) -> AnteResult<Option<Self>> {
        tx.extension_options
            .iter()
            .find(|option| option.type_url == DYNAMIC_FEE_EXTENSION_TYPE_URL)
            .map(|option| Self::decode(&option.value))
            .transpose()
    }
}

/// Accepts well-formed dynamic fee extension options on native transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicFeeExtensionChecker;

impl ExtensionOptionChecker for DynamicFeeExtensionChecker {
    fn accepts(&self, type_url: &str, value: &[u8]) -> bool {
        type_url == DYNAMIC_FEE_EXTENSION_TYPE_URL
            && ExtensionOptionDynamicFeeTx::decode(value).is_ok()
    }
}

/// Base-fee aware [`TxFeeChecker`].
///
/// Falls back to the node's minimum gas prices before London or while the
/// base fee is disabled. Genesis transactions are not checked.
pub struct DynamicFeeChecker {
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
}

impl DynamicFeeChecker {
    pub fn new(
        evm_keeper: Arc<dyn EvmKeeper>,
        fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    ) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
        }
    }
}

impl TxFeeChecker for DynamicFeeChecker {
    fn check_tx_fee(&self, ctx: &AnteContext, tx: &Tx) -> AnteResult<(Coins, u64)> {
        if ctx.block_height() == 0 {
            return Ok((tx.fee.amount.clone(), 0));
        }

        let params = self.evm_keeper.params();
        if !params.is_london(ctx.block_height()) || !self.fee_market_keeper.is_base_fee_enabled(ctx)
        {
            let priority = check_tx_fee_with_validator_min_gas_prices(ctx, tx)?;
            return Ok((tx.fee.amount.clone(), priority));
        }

        let denom = params.coin_info.denom;
        let base_fee = self.fee_market_keeper.base_fee();
        let max_priority_price =
            ExtensionOptionDynamicFeeTx::from_tx(tx)?.map(|option| option.max_priority_price);

        if tx.gas() == 0 {
            return Err(AnteError::new(
                ErrorKind::InvalidGasLimit,
                "must provide positive gas",
            ));
        }
        let gas = U256::from(tx.gas());
        let fee_cap = Dec::from_int(tx.fee.amount.amount_of(&denom))
            .and_then(|amount| amount.checked_quo_int(gas))
            .ok_or_else(|| AnteError::invalid_coins("fee amount overflows"))?;
        if fee_cap < base_fee {
            return Err(AnteError::insufficient_fee(format!(
                "gas prices too low, got: {fee_cap}{denom} required: {base_fee}{denom}. \
                 Please retry using a higher gas price or a higher fee"
            )));
        }

        // fee_cap >= base_fee, so the tip below is never negative
        let effective_price = match max_priority_price {
            Some(tip_cap) => base_fee
                .checked_add(tip_cap)
                .map_or(fee_cap, |price| price.min(fee_cap)),
            None => fee_cap,
        };
        let effective_fee = effective_price
            .checked_mul_int(gas)
            .ok_or_else(|| AnteError::invalid_coins("effective fee overflows"))?
            .ceil();
        let tip = effective_price
            .checked_sub(base_fee)
            .unwrap_or(Dec::ZERO)
            .truncate();
        let priority = tip
            .min(U256::from(i64::MAX as u64))
            .saturating_to::<u64>();

        trace!(%effective_price, %base_fee, priority, "checked dynamic fee");
        Ok((Coins::single(denom, effective_fee), priority))
    }
}
