//! Shape of a transaction wrapping Ethereum messages.

use std::sync::Arc;

use alloy_primitives::U256;

use super::eth_msgs;
use crate::chain::AnteDecorator;
use crate::coins::Coins;
use crate::context::AnteContext;
use crate::denom::EvmCoinInfo;
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::keepers::EvmKeeper;
use crate::tx::Tx;

/// A wrapped Ethereum transaction carries only Ethereum messages, exactly
/// the marker extension option, no memo, timeout, signatures, payer or
/// granter, and a fee equal to the messages' gas and fee.
pub fn validate_ethereum_envelope(tx: &Tx, coin_info: &EvmCoinInfo) -> AnteResult<()> {
    if tx.extension_options.len() != 1 {
        return Err(AnteError::new(
            ErrorKind::UnknownExtensionOptions,
            "for eth tx length of ExtensionOptions should be 1",
        ));
    }
    let msgs = eth_msgs(tx)?;
    if !tx.memo.is_empty() {
        return Err(AnteError::invalid_request("for eth tx memo must be empty"));
    }
    if tx.timeout_height != 0 {
        return Err(AnteError::invalid_request("for eth tx TimeoutHeight must be zero"));
    }
    if !tx.signatures.is_empty() || !tx.signer_infos.is_empty() {
        return Err(AnteError::invalid_request(
            "for eth tx Signatures and SignerInfos should be empty",
        ));
    }
    if tx.fee.payer.is_some() || tx.fee.granter.is_some() {
        return Err(AnteError::invalid_request(
            "for eth tx fee payer and granter should be empty",
        ));
    }

    let mut gas = 0u64;
    let mut fee = U256::ZERO;
    for msg in &msgs {
        gas = gas.saturating_add(msg.gas());
        fee = fee.saturating_add(msg.data().fee()?);
    }
    if tx.fee.gas_limit != gas {
        return Err(AnteError::new(
            ErrorKind::InvalidGasLimit,
            format!("invalid fee gas limit ({}) != {gas}", tx.fee.gas_limit),
        ));
    }
    let expected = Coins::single(coin_info.denom.clone(), coin_info.from_evm_ceil(fee));
    if tx.fee.amount != expected {
        return Err(AnteError::invalid_request(format!(
            "invalid fee amount ({}) != {expected}",
            tx.fee.amount
        )));
    }
    Ok(())
}

pub struct EthEnvelopeDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
}

impl EthEnvelopeDecorator {
    pub fn new(evm_keeper: Arc<dyn EvmKeeper>) -> Self {
        Self { evm_keeper }
    }
}

impl AnteDecorator for EthEnvelopeDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        validate_ethereum_envelope(tx, &self.evm_keeper.params().coin_info)
    }

    fn name(&self) -> &'static str {
        "EthEnvelopeDecorator"
    }
}
