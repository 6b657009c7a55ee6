//! Fused nonce check and increment.

use std::sync::Arc;

use super::eth_msgs;
use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{Account, AccountKeeper};
use crate::tx::Tx;

/// Require `tx_nonce` to equal the stored sequence, then store
/// `sequence + 1`.
///
/// Several messages from one sender in a transaction validate against the
/// sequentially implied nonces since each call sees the previous write.
pub fn increment_nonce(
    account_keeper: &dyn AccountKeeper,
    mut account: Account,
    tx_nonce: u64,
) -> AnteResult<()> {
    let nonce = account.sequence;
    if tx_nonce != nonce {
        return Err(AnteError::invalid_nonce(tx_nonce, nonce));
    }
    account.sequence = nonce
        .checked_add(1)
        .ok_or_else(|| AnteError::invalid_request(format!("failed to set sequence to {nonce} + 1")))?;
    account_keeper.set_account(account);
    Ok(())
}

/// Increment for an existing sender account.
pub(crate) fn increment_sender_nonce(
    account_keeper: &dyn AccountKeeper,
    from: alloy_primitives::Address,
    tx_nonce: u64,
) -> AnteResult<()> {
    let account = account_keeper
        .get_account(from)
        .ok_or_else(|| AnteError::unknown_address(format!("account {from} is nil")))?;
    increment_nonce(account_keeper, account, tx_nonce)
}

pub struct EthIncrementSenderSequenceDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl EthIncrementSenderSequenceDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for EthIncrementSenderSequenceDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        for msg in eth_msgs(tx)? {
            increment_sender_nonce(self.account_keeper.as_ref(), msg.from(), msg.data().nonce())?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "EthIncrementSenderSequenceDecorator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::MemoryAccountKeeper;
    use alloy_primitives::Address;

    fn keeper_with_sequence(sequence: u64) -> (MemoryAccountKeeper, Account) {
        let keeper = MemoryAccountKeeper::new();
        let mut account = keeper.new_account_with_address(Address::repeat_byte(1));
        account.sequence = sequence;
        keeper.set_account(account.clone());
        (keeper, account)
    }

    #[test]
    fn test_matching_nonce_increments() {
        let (keeper, account) = keeper_with_sequence(3);
        increment_nonce(&keeper, account.clone(), 3).unwrap();
        assert_eq!(keeper.get_sequence(account.address).unwrap(), 4);
    }

    #[test]
    fn test_mismatch_leaves_sequence() {
        let (keeper, account) = keeper_with_sequence(0);
        let err = increment_nonce(&keeper, account.clone(), 1).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidSequence);
        assert_eq!(err.detail(), "invalid nonce; got 1, expected 0");
        assert_eq!(keeper.get_sequence(account.address).unwrap(), 0);
    }

    #[test]
    fn test_same_sender_messages_chain() {
        let (keeper, account) = keeper_with_sequence(0);
        for nonce in 0..3 {
            increment_sender_nonce(&keeper, account.address, nonce).unwrap();
        }
        assert_eq!(keeper.get_sequence(account.address).unwrap(), 3);

        let err = increment_sender_nonce(&keeper, Address::repeat_byte(9), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAddress);
    }
}
