//! Configuration types for the ante handler.

use serde::Deserialize;

use crate::coins::DecCoins;
use crate::context::AnteContext;
use crate::cosmos::DEFAULT_MAX_NESTED_AUTHZ_DEPTH;
use crate::denom::{EvmCoinInfo, EVM_DECIMALS};
use crate::feemarket::FeeMarketParams;
use crate::keepers::{EvmParams, FeeMarketKeeper};
use crate::options::HandlerOptions;

/// Root configuration of transaction admission.
///
/// Each section has one consumer: the limits go onto [`HandlerOptions`]
/// via [`AnteConfig::apply`], `min_gas_prices` onto every mempool context
/// via [`AnteConfig::apply_to_context`], `fee_market` into the fee market
/// keeper at genesis via [`AnteConfig::init_fee_market`], and `evm` into
/// the EVM keeper via [`AnteConfig::evm_params`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnteConfig {
    /// Per-message cap on gas wanted during mempool admission. 0 disables it.
    #[serde(default)]
    pub max_tx_gas_wanted: u64,

    #[serde(default = "AnteConfig::default_max_nested_authz_depth")]
    pub max_nested_authz_depth: usize,

    /// Message type URLs that may not be executed or granted through authz.
    #[serde(default)]
    pub disabled_authz_msgs: Vec<String>,

    /// This node's minimum gas prices, e.g. `"0.5aevm"`.
    #[serde(default)]
    pub min_gas_prices: DecCoins,

    /// EVM chain and coin configuration.
    pub evm: EvmConfig,

    /// Genesis fee market parameters.
    #[serde(default)]
    pub fee_market: FeeMarketParams,
}

impl AnteConfig {
    const fn default_max_nested_authz_depth() -> usize {
        DEFAULT_MAX_NESTED_AUTHZ_DEPTH
    }

    /// Copy the limits of this config onto `options`.
    pub fn apply(&self, options: HandlerOptions) -> HandlerOptions {
        options
            .max_tx_gas_wanted(self.max_tx_gas_wanted)
            .max_nested_authz_depth(self.max_nested_authz_depth)
            .disabled_authz_msgs(self.disabled_authz_msgs.iter().cloned())
    }

    /// Install this node's minimum gas prices on `ctx`.
    pub fn apply_to_context(&self, ctx: AnteContext) -> AnteContext {
        ctx.with_min_gas_prices(self.min_gas_prices.clone())
    }

    /// Seed `keeper` with the genesis parameters and base fee.
    pub fn init_fee_market(&self, keeper: &dyn FeeMarketKeeper) {
        keeper.set_params(self.fee_market.clone());
        keeper.set_base_fee(self.fee_market.base_fee);
    }

    pub fn evm_params(&self) -> EvmParams {
        self.evm.params()
    }
}

/// EVM chain and coin configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvmConfig {
    /// EIP-155 chain id. Must be > 0.
    pub chain_id: u64,

    /// Bank denom of the gas token.
    pub denom: String,

    /// 18-decimal denom. Defaults to `denom`.
    #[serde(default)]
    pub extended_denom: Option<String>,

    /// Decimals of the bank denom. Default: 18.
    #[serde(default = "EvmConfig::default_decimals")]
    pub decimals: u8,

    /// First London height; `null` keeps London inactive. Default: 0.
    #[serde(default = "EvmConfig::default_london_height")]
    pub london_height: Option<u64>,

    #[serde(default)]
    pub allow_unprotected_txs: bool,
}

impl EvmConfig {
    const fn default_decimals() -> u8 {
        EVM_DECIMALS
    }

    const fn default_london_height() -> Option<u64> {
        Some(0)
    }

    pub fn coin_info(&self) -> EvmCoinInfo {
        let extended = self
            .extended_denom
            .clone()
            .unwrap_or_else(|| self.denom.clone());
        EvmCoinInfo::new(self.denom.clone(), extended, self.decimals)
    }

    pub fn params(&self) -> EvmParams {
        EvmParams {
            chain_id: self.chain_id,
            coin_info: self.coin_info(),
            london_height: self.london_height,
            allow_unprotected_txs: self.allow_unprotected_txs,
        }
    }
}
