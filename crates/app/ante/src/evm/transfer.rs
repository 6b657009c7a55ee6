//! Affordability of the top-level call in the EVM balance view.

use std::sync::Arc;

use alloy_primitives::U256;
use evolve_tx_eth::CoreMessage;

use super::{eth_msgs, EvmTxEnv};
use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{EvmKeeper, FeeMarketKeeper};
use crate::tx::Tx;

/// After London the fee cap must cover the base fee; the sender's EVM
/// balance must cover `gas_limit * effective_gas_price + value`.
pub fn can_transfer(
    evm_keeper: &dyn EvmKeeper,
    msg: &CoreMessage,
    base_fee: Option<U256>,
    is_london: bool,
) -> AnteResult<()> {
    if is_london {
        if let Some(base_fee) = base_fee {
            if msg.gas_fee_cap < base_fee {
                return Err(AnteError::insufficient_fee(format!(
                    "max fee per gas less than block base fee ({} < {base_fee})",
                    msg.gas_fee_cap
                )));
            }
        }
    }

    let required = msg.max_spend().ok_or_else(|| {
        AnteError::invalid_coins(format!(
            "tx cost overflows: gas {} * price {} + value {}",
            msg.gas_limit, msg.gas_price, msg.value
        ))
    })?;
    let balance = evm_keeper.spendable_balance(msg.from);
    if balance < required {
        return Err(AnteError::insufficient_funds(format!(
            "failed to transfer {} from address {} using the EVM block context transfer function: balance {balance} < {required}",
            msg.value, msg.from
        )));
    }
    Ok(())
}

pub struct CanTransferDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
}

impl CanTransferDecorator {
    pub fn new(evm_keeper: Arc<dyn EvmKeeper>, fee_market_keeper: Arc<dyn FeeMarketKeeper>) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
        }
    }
}

impl AnteDecorator for CanTransferDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let env = EvmTxEnv::load(ctx, self.evm_keeper.as_ref(), self.fee_market_keeper.as_ref());
        for msg in eth_msgs(tx)? {
            let core = msg.as_message(env.base_fee);
            can_transfer(self.evm_keeper.as_ref(), &core, env.base_fee, env.is_london)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "CanTransferDecorator"
    }
}
