//! Sender account checks: EOA only, lazy creation, balance and nonce.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::Address;
use evolve_tx_eth::TxData;
use tracing::debug;

use super::eth_msgs;
use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{AccountKeeper, EvmAccount, EvmKeeper};
use crate::tx::Tx;

/// Check the sender can pay the full cost of `data`.
///
/// A missing account is created and stored first, and stays created even
/// when the balance check fails.
pub fn verify_account_balance(
    account_keeper: &dyn AccountKeeper,
    account: Option<&EvmAccount>,
    from: Address,
    data: &TxData,
) -> AnteResult<()> {
    if account.is_some_and(EvmAccount::is_contract) {
        return Err(AnteError::invalid_type(format!(
            "the sender is not EOA: address {from}"
        )));
    }

    let balance = match account {
        Some(account) => account.balance,
        None => {
            let created = account_keeper.new_account_with_address(from);
            debug!(sender = %from, account_number = created.account_number, "created sender account");
            account_keeper.set_account(created);
            EvmAccount::empty().balance
        }
    };

    let cost = data.cost().map_err(|_| {
        AnteError::invalid_coins(format!(
            "tx cost overflows: gas price {} * gas {} + value {}",
            data.gas_price(),
            data.gas_limit(),
            data.value()
        ))
    })?;
    if balance < cost {
        return Err(AnteError::insufficient_funds(format!(
            "sender balance < tx cost ({balance} < {cost})"
        ))
        .wrap("failed to check sender balance"));
    }
    Ok(())
}

/// Compare the payload nonce with the account nonce plus the number of
/// earlier payloads from the same sender in this transaction.
pub fn check_sender_nonce(
    account: Option<&EvmAccount>,
    pending: u64,
    tx_nonce: u64,
) -> AnteResult<()> {
    let expected = account
        .map_or(0, |account| account.nonce)
        .saturating_add(pending);
    if tx_nonce != expected {
        return Err(AnteError::invalid_nonce(tx_nonce, expected));
    }
    Ok(())
}

pub struct EthAccountVerificationDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    evm_keeper: Arc<dyn EvmKeeper>,
}

impl EthAccountVerificationDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>, evm_keeper: Arc<dyn EvmKeeper>) -> Self {
        Self {
            account_keeper,
            evm_keeper,
        }
    }
}

impl AnteDecorator for EthAccountVerificationDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let mut pending: BTreeMap<Address, u64> = BTreeMap::new();
        for msg in eth_msgs(tx)? {
            let from = msg.from();
            let account = self.evm_keeper.get_account(from);
            verify_account_balance(self.account_keeper.as_ref(), account.as_ref(), from, msg.data())?;

            let seen = pending.entry(from).or_default();
            check_sender_nonce(account.as_ref(), *seen, msg.data().nonce())?;
            *seen += 1;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EthAccountVerificationDecorator"
    }
}
