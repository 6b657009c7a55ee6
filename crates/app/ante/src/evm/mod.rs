//! Admission of wrapped Ethereum transactions.
//!
//! Every step exists as a function, as a standalone decorator for chains
//! over multi-message transactions, and fused into [`EvmMonoDecorator`].

pub mod account;
pub mod envelope;
pub mod gas;
pub mod mono;
pub mod nonce;
pub mod setup;
pub mod signature;
pub mod transfer;

use alloy_primitives::U256;

use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::feemarket::FeeMarketParams;
use crate::keepers::{EvmKeeper, EvmParams, FeeMarketKeeper};
use crate::math::Dec;
use crate::tx::{Msg, Tx};
use evolve_tx_eth::{MsgEthereumTx, MSG_ETHEREUM_TX_TYPE_URL};

pub use account::{check_sender_nonce, verify_account_balance, EthAccountVerificationDecorator};
pub use envelope::{validate_ethereum_envelope, EthEnvelopeDecorator};
pub use gas::{
    check_gas_wanted, consume_fees_and_emit_event, eth_fee_coins, update_cumulative_gas_wanted,
    EthGasConsumeDecorator, GasWantedDecorator,
};
pub use mono::EvmMonoDecorator;
pub use nonce::{increment_nonce, EthIncrementSenderSequenceDecorator};
pub use setup::{check_eth_fees, check_intrinsic_gas, tx_priority, EthSetupContextDecorator};
pub use signature::{verify_eth_signature, EthSigVerificationDecorator};
pub use transfer::{can_transfer, CanTransferDecorator};

/// Values every EVM step reads, loaded once per transaction.
#[derive(Debug, Clone)]
pub struct EvmTxEnv {
    pub params: EvmParams,
    pub fee_market: FeeMarketParams,
    /// Base fee in EVM units.
    pub base_fee: Option<U256>,
    pub is_london: bool,
    /// Local node minimum gas price, in EVM units.
    pub mempool_min_gas_price: Dec,
    /// Chain-wide minimum gas price, in EVM units.
    pub global_min_gas_price: Dec,
}

impl EvmTxEnv {
    pub fn load(
        ctx: &AnteContext,
        evm_keeper: &dyn EvmKeeper,
        fee_market_keeper: &dyn FeeMarketKeeper,
    ) -> Self {
        let params = evm_keeper.params();
        let fee_market = fee_market_keeper.params();
        let coin_info = &params.coin_info;
        let mempool_min_gas_price =
            coin_info.dec_to_evm(ctx.min_gas_prices().amount_of(&coin_info.denom));
        let global_min_gas_price = coin_info.dec_to_evm(fee_market.min_gas_price);
        Self {
            base_fee: evm_keeper.base_fee(ctx),
            is_london: params.is_london(ctx.block_height()),
            params,
            fee_market,
            mempool_min_gas_price,
            global_min_gas_price,
        }
    }
}

/// The Ethereum payload of `msg`, or an error naming the unexpected type.
pub(crate) fn unpack_eth_msg(msg: &Msg) -> AnteResult<&MsgEthereumTx> {
    msg.as_ethereum().ok_or_else(|| {
        AnteError::invalid_type(format!(
            "invalid message type {}, expected {MSG_ETHEREUM_TX_TYPE_URL}",
            msg.type_url()
        ))
    })
}

/// All Ethereum payloads of `tx`.
pub(crate) fn eth_msgs(tx: &Tx) -> AnteResult<Vec<&MsgEthereumTx>> {
    tx.msgs.iter().map(unpack_eth_msg).collect()
}
