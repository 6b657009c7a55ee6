//! Context setup, basic validation, fee policy and priority.

use std::sync::Arc;

use alloy_primitives::U256;
use evolve_tx_eth::{intrinsic_gas, tx_type, MsgEthereumTx, TxData};

use super::{eth_msgs, EvmTxEnv};
use crate::chain::AnteDecorator;
use crate::context::{AnteContext, GasMeter};
use crate::denom::EvmCoinInfo;
use crate::error::{AnteError, AnteResult};
use crate::fees::{check_global_fee, check_mempool_fee};
use crate::keepers::{EvmKeeper, FeeMarketKeeper};
use crate::math::Dec;
use crate::tx::Tx;

fn to_dec(amount: U256) -> AnteResult<Dec> {
    Dec::from_int(amount).ok_or_else(|| AnteError::invalid_coins(format!("fee overflow: {amount}")))
}

/// Local and global minimum fee checks for one Ethereum payload.
///
/// The mempool check runs only on mempool admission and never while
/// simulating. The global check uses the effective fee of dynamic fee
/// transactions once a base fee exists.
pub fn check_eth_fees(
    ctx: &AnteContext,
    env: &EvmTxEnv,
    data: &TxData,
    simulate: bool,
) -> AnteResult<()> {
    let gas_limit = Dec::from_u64(data.gas_limit());
    let mut fee = to_dec(data.fee()?)?;

    if ctx.is_check_tx() && !simulate {
        check_mempool_fee(fee, env.mempool_min_gas_price, gas_limit, env.is_london)?;
    }

    if data.tx_type() == tx_type::DYNAMIC_FEE && env.base_fee.is_some() {
        fee = to_dec(data.effective_fee(env.base_fee)?)?;
    }

    check_global_fee(fee, env.global_min_gas_price, gas_limit)
}

/// Reject payloads whose gas limit does not cover intrinsic gas.
pub fn check_intrinsic_gas(data: &TxData, is_shanghai: bool) -> AnteResult<()> {
    let intrinsic = intrinsic_gas(
        data.input(),
        data.access_list(),
        data.is_contract_creation(),
        is_shanghai,
    )?;
    if data.gas_limit() < intrinsic {
        return Err(AnteError::out_of_gas(format!(
            "gas limit too low: {} (gas limit) < {intrinsic} (intrinsic gas)",
            data.gas_limit()
        )));
    }
    Ok(())
}

/// Effective tip per gas in bank units, used as mempool priority.
pub fn tx_priority(data: &TxData, base_fee: Option<U256>, coin_info: &EvmCoinInfo) -> u64 {
    let tip = data.effective_tip(base_fee);
    u64::try_from(coin_info.from_evm(tip)).unwrap_or(u64::MAX)
}

/// Infinite gas meter, basic validation, fee policy and intrinsic gas.
pub(crate) fn setup_eth_msg(
    ctx: &AnteContext,
    env: &EvmTxEnv,
    msg: &MsgEthereumTx,
    simulate: bool,
) -> AnteResult<u64> {
    msg.validate_basic()?;
    let data = msg.data();
    check_eth_fees(ctx, env, data, simulate)?;
    // Forks after London activate together on this chain.
    check_intrinsic_gas(data, env.is_london)?;
    Ok(tx_priority(data, env.base_fee, &env.params.coin_info))
}

/// Runs setup over every message; priority is the lowest of them.
pub struct EthSetupContextDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
}

impl EthSetupContextDecorator {
    pub fn new(evm_keeper: Arc<dyn EvmKeeper>, fee_market_keeper: Arc<dyn FeeMarketKeeper>) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
        }
    }
}

impl AnteDecorator for EthSetupContextDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        ctx.gas_meter = GasMeter::infinite();
        let env = EvmTxEnv::load(ctx, self.evm_keeper.as_ref(), self.fee_market_keeper.as_ref());

        let mut priority = u64::MAX;
        for msg in eth_msgs(tx)? {
            priority = priority.min(setup_eth_msg(ctx, &env, msg, simulate)?);
        }
        ctx.set_priority(priority);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EthSetupContextDecorator"
    }
}
