//! Fee deduction and block gas accounting.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use evolve_tx_eth::TxData;
use tracing::debug;

use super::{eth_msgs, EvmTxEnv};
use crate::chain::AnteDecorator;
use crate::coins::Coins;
use crate::context::{AnteContext, Event, GasMeter};
use crate::denom::EvmCoinInfo;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{EvmKeeper, FeeMarketKeeper};
use crate::tx::Tx;

pub const EVENT_TYPE_TX: &str = "tx";
pub const ATTRIBUTE_KEY_FEE: &str = "fee";
pub const ATTRIBUTE_KEY_FEE_PAYER: &str = "fee_payer";

/// Effective fee of `data` as bank coins, rounded up. Zero fees give no
/// coins.
pub fn eth_fee_coins(
    data: &TxData,
    base_fee: Option<U256>,
    coin_info: &EvmCoinInfo,
) -> AnteResult<Coins> {
    let fee = data.effective_fee(base_fee)?;
    Ok(Coins::single(
        coin_info.denom.clone(),
        coin_info.from_evm_ceil(fee),
    ))
}

/// Charge `fees` to `from` and emit one `tx` event carrying the fee.
///
/// Nothing is emitted when the deduction fails.
pub fn consume_fees_and_emit_event(
    ctx: &mut AnteContext,
    evm_keeper: &dyn EvmKeeper,
    fees: &Coins,
    from: Address,
) -> AnteResult<()> {
    evm_keeper
        .deduct_tx_costs_from_user_balance(fees, from)
        .map_err(|err| err.wrap("failed to deduct transaction costs from user balance"))?;

    ctx.events
        .emit(Event::new(EVENT_TYPE_TX).with_attribute(ATTRIBUTE_KEY_FEE, fees.to_string()));
    Ok(())
}

/// Add one message's gas wanted to `cumulative_gas_wanted`.
///
/// On mempool admission a message counts for at most `max_tx_gas_wanted`
/// (0 disables the cap) so transactions that never reach a block cannot
/// inflate the next base fee.
pub fn update_cumulative_gas_wanted(
    ctx: &AnteContext,
    msg_gas_wanted: u64,
    max_tx_gas_wanted: u64,
    cumulative_gas_wanted: u64,
) -> u64 {
    let contribution = if ctx.is_check_tx() && max_tx_gas_wanted != 0 {
        msg_gas_wanted.min(max_tx_gas_wanted)
    } else {
        msg_gas_wanted
    };
    cumulative_gas_wanted.saturating_add(contribution)
}

/// Reject transactions that do not fit the block and record their gas
/// wanted. Only applies after London while the base fee is enabled.
pub fn check_gas_wanted(
    ctx: &mut AnteContext,
    fee_market_keeper: &dyn FeeMarketKeeper,
    tx: &Tx,
    is_london: bool,
    max_tx_gas_wanted: u64,
) -> AnteResult<()> {
    if !is_london || !fee_market_keeper.is_base_fee_enabled(ctx) {
        return Ok(());
    }

    let gas_wanted = tx.gas();
    let remaining = ctx.block.block_gas_meter.remaining();
    if gas_wanted > remaining {
        return Err(AnteError::out_of_gas(format!(
            "tx gas ({gas_wanted}) exceeds block gas limit ({remaining})"
        )));
    }

    let contribution = update_cumulative_gas_wanted(ctx, gas_wanted, max_tx_gas_wanted, 0);
    let total = fee_market_keeper.add_transient_gas_wanted(ctx, contribution)?;
    debug!(gas_wanted, contribution, total, "added transient gas wanted");
    Ok(())
}

/// Deducts every message's fee, then limits the tx gas meter to the
/// cumulative gas wanted.
pub struct EthGasConsumeDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    max_tx_gas_wanted: u64,
}

impl EthGasConsumeDecorator {
    pub fn new(
        evm_keeper: Arc<dyn EvmKeeper>,
        fee_market_keeper: Arc<dyn FeeMarketKeeper>,
        max_tx_gas_wanted: u64,
    ) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
            max_tx_gas_wanted,
        }
    }
}

impl AnteDecorator for EthGasConsumeDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let env = EvmTxEnv::load(ctx, self.evm_keeper.as_ref(), self.fee_market_keeper.as_ref());

        let mut gas_wanted = 0u64;
        for msg in eth_msgs(tx)? {
            let fees = eth_fee_coins(msg.data(), env.base_fee, &env.params.coin_info)?;
            consume_fees_and_emit_event(ctx, self.evm_keeper.as_ref(), &fees, msg.from())?;
            gas_wanted =
                update_cumulative_gas_wanted(ctx, msg.gas(), self.max_tx_gas_wanted, gas_wanted);
        }
        ctx.gas_meter = GasMeter::infinite_with_limit(gas_wanted);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EthGasConsumeDecorator"
    }
}

/// Block gas check for any transaction.
pub struct GasWantedDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    max_tx_gas_wanted: u64,
}

impl GasWantedDecorator {
    pub fn new(
        evm_keeper: Arc<dyn EvmKeeper>,
        fee_market_keeper: Arc<dyn FeeMarketKeeper>,
        max_tx_gas_wanted: u64,
    ) -> Self {
        Self {
            evm_keeper,
            fee_market_keeper,
            max_tx_gas_wanted,
        }
    }
}

impl AnteDecorator for GasWantedDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let is_london = self.evm_keeper.params().is_london(ctx.block_height());
        check_gas_wanted(
            ctx,
            self.fee_market_keeper.as_ref(),
            tx,
            is_london,
            self.max_tx_gas_wanted,
        )
    }

    fn name(&self) -> &'static str {
        "GasWantedDecorator"
    }
}
