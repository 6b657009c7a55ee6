//! Errors raised while decoding and validating Ethereum messages.

use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Failure modes of Ethereum message handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("failed to recover signer from signature")]
    SignatureRecovery,

    #[error("invalid secp256k1 public key")]
    InvalidPublicKey,

    #[error("invalid chain id for signer: expected {expected}, got {actual:?}")]
    InvalidChainId { expected: u64, actual: Option<u64> },

    #[error("sender verification failed. got {recovered}, expected {declared}")]
    SenderMismatch { recovered: Address, declared: Address },

    #[error("unsupported transaction type {0}")]
    UnsupportedTxType(u8),

    #[error("failed to decode transaction")]
    Decode,

    #[error("empty transaction input")]
    EmptyInput,

    #[error("sender address is missing")]
    MissingSender,

    #[error("gas limit must not be zero")]
    ZeroGasLimit,

    #[error("gas limit must be less than math.MaxInt64: {0}")]
    GasOverflow(u64),

    #[error("max priority fee per gas higher than max fee per gas ({tip_cap} > {fee_cap})")]
    TipAboveFeeCap { tip_cap: u128, fee_cap: u128 },

    #[error("invalid tx hash {got}, expected: {expected}")]
    HashMismatch { got: B256, expected: B256 },

    #[error("fee computation overflows 256 bits")]
    FeeOverflow,

    #[error("intrinsic gas computation overflows 64 bits")]
    IntrinsicGasOverflow,
}

/// Result alias for Ethereum message operations.
pub type TxResult<T> = Result<T, TxError>;
