//! Ethereum transactions as messages of a native transaction.
//!
//! A [`MsgEthereumTx`] wraps one signed EIP-2718 payload ([`TxData`]) and
//! the sender it claims. The admission pipeline uses this crate to:
//!
//! - recover and verify the sender against the declared `from`
//! - enforce EIP-155 replay protection ([`ChainIdPolicy`])
//! - compute fees, costs and effective gas prices against a base fee
//! - compute intrinsic gas
//!
//! # Usage
//!
//! ```text
//! use evolve_tx_eth::{ChainIdPolicy, MsgEthereumTx};
//!
//! let msg = MsgEthereumTx::decode(&raw)?;
//! msg.validate_basic()?;
//! msg.verify_sender(&ChainIdPolicy::strict(9000))?;
//! let fee = msg.data().effective_fee(base_fee)?;
//! ```

pub mod chain_id;
pub mod error;
pub mod gas;
pub mod msg;
pub mod recovery;
pub mod tx_data;

pub use chain_id::ChainIdPolicy;
pub use error::{TxError, TxResult};
pub use gas::intrinsic_gas;
pub use msg::{CoreMessage, MsgEthereumTx, MSG_ETHEREUM_TX_TYPE_URL};
pub use recovery::{address_from_sec1_bytes, recover_sender_from_signature_hash};
pub use tx_data::{tx_type, TxData};
