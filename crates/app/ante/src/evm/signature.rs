//! Sender signature verification with EIP-155 replay protection.

use std::sync::Arc;

use evolve_tx_eth::{ChainIdPolicy, MsgEthereumTx};

use super::eth_msgs;
use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{EvmKeeper, EvmParams};
use crate::tx::Tx;

/// The recovered signer must be the declared sender; unprotected legacy
/// transactions pass only if the chain allows them.
pub fn verify_eth_signature(msg: &MsgEthereumTx, params: &EvmParams) -> AnteResult<()> {
    let policy = ChainIdPolicy::new(params.chain_id, params.allow_unprotected_txs);
    if msg.data().chain_id().is_none() && !params.allow_unprotected_txs {
        return Err(AnteError::from(evolve_tx_eth::TxError::InvalidChainId {
            expected: params.chain_id,
            actual: None,
        })
        .wrap("rejected unprotected Ethereum transaction. Please EIP155 sign your transaction to protect it against replay-attacks"));
    }
    msg.verify_sender(&policy).map_err(|err| {
        AnteError::from(err).wrap(format!("failed to verify sender of tx {}", msg.hash()))
    })
}

pub struct EthSigVerificationDecorator {
    evm_keeper: Arc<dyn EvmKeeper>,
}

impl EthSigVerificationDecorator {
    pub fn new(evm_keeper: Arc<dyn EvmKeeper>) -> Self {
        Self { evm_keeper }
    }
}

impl AnteDecorator for EthSigVerificationDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let params = self.evm_keeper.params();
        for msg in eth_msgs(tx)? {
            verify_eth_signature(msg, &params)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EthSigVerificationDecorator"
    }
}
