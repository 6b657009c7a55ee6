//! Stateless checks of native transactions.

use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::tx::{Msg, Tx};

pub const DEFAULT_MAX_MEMO_CHARACTERS: usize = 256;

/// Ethereum messages are only accepted inside the Ethereum envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectMessagesDecorator;

impl AnteDecorator for RejectMessagesDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        if tx.msgs.iter().any(|msg| matches!(msg, Msg::Ethereum(_))) {
            return Err(AnteError::invalid_type(
                "MsgEthereumTx needs to be contained within a tx with 'ExtensionOptionsEthereumTx' option",
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RejectMessagesDecorator"
    }
}

/// [`Tx::validate_basic`], skipped on re-check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateBasicDecorator;

impl AnteDecorator for ValidateBasicDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        if ctx.is_recheck_tx() {
            return Ok(());
        }
        tx.validate_basic()
    }

    fn name(&self) -> &'static str {
        "ValidateBasicDecorator"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TxTimeoutHeightDecorator;

impl AnteDecorator for TxTimeoutHeightDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let timeout = tx.timeout_height;
        if timeout > 0 && ctx.block_height() > timeout {
            return Err(AnteError::new(
                ErrorKind::TxTimeoutHeight,
                format!(
                    "block height: {}, timeout height: {timeout}",
                    ctx.block_height()
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "TxTimeoutHeightDecorator"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidateMemoDecorator {
    max_memo_characters: usize,
}

impl ValidateMemoDecorator {
    pub fn new(max_memo_characters: usize) -> Self {
        Self {
            max_memo_characters,
        }
    }
}

impl Default for ValidateMemoDecorator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMO_CHARACTERS)
    }
}

impl AnteDecorator for ValidateMemoDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let length = tx.memo.chars().count();
        if length > self.max_memo_characters {
            return Err(AnteError::new(
                ErrorKind::MemoTooLarge,
                format!(
                    "maximum number of characters is {} but received {length} characters",
                    self.max_memo_characters
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ValidateMemoDecorator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecMode;
    use crate::testing::{legacy_tx, TestSigner};
    use alloy_primitives::{Address, U256};

    fn ctx(height: u64) -> AnteContext {
        AnteContext::new("c", height, ExecMode::Deliver)
    }

    #[test]
    fn test_ethereum_msg_rejected_in_native_tx() {
        let msg = TestSigner::new(1).eth_msg(legacy_tx(0, 1, 21_000, U256::ZERO));
        let tx = Tx {
            msgs: vec![Msg::ethereum(msg)],
            ..Tx::default()
        };
        let err = RejectMessagesDecorator
            .ante_handle(&mut ctx(1), &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn test_timeout_height() {
        let tx = Tx {
            timeout_height: 10,
            ..Tx::default()
        };
        assert!(TxTimeoutHeightDecorator.ante_handle(&mut ctx(10), &tx, false).is_ok());
        let err = TxTimeoutHeightDecorator
            .ante_handle(&mut ctx(11), &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TxTimeoutHeight);
        assert!(TxTimeoutHeightDecorator
            .ante_handle(&mut ctx(99), &Tx::default(), false)
            .is_ok());
    }

    #[test]
    fn test_memo_counts_characters() {
        let mut tx = Tx {
            memo: "é".repeat(256),
            ..Tx::default()
        };
        assert!(ValidateMemoDecorator::default()
            .ante_handle(&mut ctx(1), &tx, false)
            .is_ok());
        tx.memo.push('x');
        let err = ValidateMemoDecorator::default()
            .ante_handle(&mut ctx(1), &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoTooLarge);
    }

    #[test]
    fn test_validate_basic_skipped_on_recheck() {
        let tx = Tx {
            msgs: vec![Msg::plain("/cosmos.bank.v1beta1.MsgSend", Address::repeat_byte(1))],
            ..Tx::default()
        };
        assert!(ValidateBasicDecorator.ante_handle(&mut ctx(1), &tx, false).is_err());
        let mut recheck = ctx(1).with_exec_mode(ExecMode::ReCheckTx);
        assert!(ValidateBasicDecorator.ante_handle(&mut recheck, &tx, false).is_ok());
    }
}
