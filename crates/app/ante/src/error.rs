//! Error taxonomy of the admission pipeline.
//!
//! Every failure carries an [`ErrorKind`] callers can match on and a detail
//! string naming the offending and expected values. Wrapping adds context
//! in front of the detail without changing the kind.

use std::fmt;

use thiserror::Error;

/// Category of an admission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("invalid type")]
    InvalidType,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid coins")]
    InvalidCoins,
    #[error("insufficient fee")]
    InsufficientFee,
    #[error("invalid sequence")]
    InvalidSequence,
    #[error("out of gas")]
    OutOfGas,
    #[error("unauthorized")]
    Unauthorized,
    /// An Ethereum transaction that does not carry exactly one message.
    #[error("invalid message count")]
    InvalidMessageCount,
    /// A required handler option is missing or invalid.
    #[error("invalid configuration")]
    Config,
    #[error("invalid request")]
    InvalidRequest,
    #[error("invalid chain-id")]
    InvalidChainId,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unknown address")]
    UnknownAddress,
    #[error("unknown extension options")]
    UnknownExtensionOptions,
    #[error("too many signatures")]
    TooManySignatures,
    #[error("tx timeout height")]
    TxTimeoutHeight,
    #[error("memo too large")]
    MemoTooLarge,
    #[error("invalid gas limit")]
    InvalidGasLimit,
    #[error("invalid pubkey")]
    InvalidPubKey,
    #[error("no signatures supplied")]
    NoSignatures,
    #[error("invalid address")]
    InvalidAddress,
}

/// Admission failure: a kind plus human readable detail.
///
/// Displays as `"{detail}: {kind}"`, or just the kind without detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.kind, .detail))]
pub struct AnteError {
    kind: ErrorKind,
    detail: String,
}

fn render(kind: &ErrorKind, detail: &str) -> String {
    if detail.is_empty() {
        kind.to_string()
    } else {
        format!("{detail}: {kind}")
    }
}

impl AnteError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Prefix `context` to the detail, keeping the kind.
    pub fn wrap(self, context: impl fmt::Display) -> Self {
        let detail = if self.detail.is_empty() {
            context.to_string()
        } else {
            format!("{context}: {}", self.detail)
        };
        Self {
            kind: self.kind,
            detail,
        }
    }

    pub fn invalid_type(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidType, detail)
    }

    pub fn insufficient_funds(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientFunds, detail)
    }

    pub fn invalid_coins(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCoins, detail)
    }

    pub fn insufficient_fee(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientFee, detail)
    }

    /// Nonce mismatch, formatted the way wallets expect to parse it.
    pub fn invalid_nonce(got: u64, expected: u64) -> Self {
        Self::new(
            ErrorKind::InvalidSequence,
            format!("invalid nonce; got {got}, expected {expected}"),
        )
    }

    pub fn out_of_gas(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfGas, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, detail)
    }

    pub fn invalid_message_count(got: usize) -> Self {
        Self::new(
            ErrorKind::InvalidMessageCount,
            format!("expected 1 message, got {got}"),
        )
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, detail)
    }

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, detail)
    }

    pub fn unknown_address(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAddress, detail)
    }
}

impl From<evolve_tx_eth::TxError> for AnteError {
    fn from(err: evolve_tx_eth::TxError) -> Self {
        use evolve_tx_eth::TxError;

        let kind = match &err {
            TxError::InvalidChainId { .. } => ErrorKind::InvalidChainId,
            TxError::SignatureRecovery
            | TxError::InvalidPublicKey
            | TxError::SenderMismatch { .. } => ErrorKind::InvalidSignature,
            TxError::ZeroGasLimit | TxError::GasOverflow(_) => ErrorKind::InvalidGasLimit,
            TxError::TipAboveFeeCap { .. } => ErrorKind::InsufficientFee,
            TxError::FeeOverflow => ErrorKind::InvalidCoins,
            TxError::IntrinsicGasOverflow => ErrorKind::OutOfGas,
            TxError::UnsupportedTxType(_) => ErrorKind::InvalidType,
            TxError::Decode
            | TxError::EmptyInput
            | TxError::MissingSender
            | TxError::HashMismatch { .. } => ErrorKind::InvalidRequest,
        };
        Self::new(kind, err.to_string())
    }
}

/// Result alias used by every pipeline step.
pub type AnteResult<T> = Result<T, AnteError>;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error when loading config.
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },

    /// Validation failed with one or more errors.
    #[error("config validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),
}
