//! Single-pass admission of a wrapped Ethereum transaction.

use std::sync::Arc;

use tracing::debug;

use super::account::{check_sender_nonce, verify_account_balance};
use super::gas::{check_gas_wanted, consume_fees_and_emit_event, eth_fee_coins, update_cumulative_gas_wanted};
use super::nonce::increment_sender_nonce;
use super::setup::setup_eth_msg;
use super::signature::verify_eth_signature;
use super::transfer::can_transfer;
use super::{unpack_eth_msg, EvmTxEnv};
use crate::chain::AnteDecorator;
use crate::context::{AnteContext, GasMeter};
use crate::error::{AnteError, AnteResult};
use crate::keepers::{AccountKeeper, EvmKeeper, FeeMarketKeeper};
use crate::tx::Tx;

/// Runs, in order: setup (gas meter, basic validation, fee policy,
/// priority), account verification, signature verification, transfer
/// affordability, fee deduction, nonce increment and block gas
/// accounting.
///
/// The sender's EVM account is read once. Store writes and failures match
/// the equivalent decorator chain for a single message.
pub struct EvmMonoDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    evm_keeper: Arc<dyn EvmKeeper>,
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    max_tx_gas_wanted: u64,
}

impl EvmMonoDecorator {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        evm_keeper: Arc<dyn EvmKeeper>,
        fee_market_keeper: Arc<dyn FeeMarketKeeper>,
        max_tx_gas_wanted: u64,
    ) -> Self {
        Self {
            account_keeper,
            evm_keeper,
            fee_market_keeper,
            max_tx_gas_wanted,
        }
    }
}

impl AnteDecorator for EvmMonoDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        let [msg] = tx.msgs.as_slice() else {
            return Err(AnteError::invalid_message_count(tx.msgs.len()));
        };
        let msg = unpack_eth_msg(msg)?;
        let data = msg.data();
        let from = msg.from();

        let env = EvmTxEnv::load(ctx, self.evm_keeper.as_ref(), self.fee_market_keeper.as_ref());

        ctx.gas_meter = GasMeter::infinite();
        let priority = setup_eth_msg(ctx, &env, msg, simulate)?;

        let account = self.evm_keeper.get_account(from);
        verify_account_balance(self.account_keeper.as_ref(), account.as_ref(), from, data)?;
        check_sender_nonce(account.as_ref(), 0, data.nonce())?;

        verify_eth_signature(msg, &env.params)?;

        let core = msg.as_message(env.base_fee);
        can_transfer(self.evm_keeper.as_ref(), &core, env.base_fee, env.is_london)?;

        let fees = eth_fee_coins(data, env.base_fee, &env.params.coin_info)?;
        consume_fees_and_emit_event(ctx, self.evm_keeper.as_ref(), &fees, from)?;
        let gas_wanted = update_cumulative_gas_wanted(ctx, data.gas_limit(), self.max_tx_gas_wanted, 0);
        ctx.gas_meter = GasMeter::infinite_with_limit(gas_wanted);
        ctx.set_priority(priority);

        increment_sender_nonce(self.account_keeper.as_ref(), from, data.nonce())?;

        check_gas_wanted(
            ctx,
            self.fee_market_keeper.as_ref(),
            tx,
            env.is_london,
            self.max_tx_gas_wanted,
        )?;

        debug!(
            sender = %from,
            tx_hash = %msg.hash(),
            nonce = data.nonce(),
            gas_wanted,
            priority,
            "admitted ethereum tx"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EvmMonoDecorator"
    }
}
