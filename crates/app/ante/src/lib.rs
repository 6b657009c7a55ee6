//! Transaction admission ("ante") pipeline for Evolve.
//!
//! Every transaction runs through an ordered chain of checks before it may
//! enter the mempool or execute in a block. Two kinds of transactions share
//! one account and balance ledger:
//!
//! - Ethereum transactions wrapped in a native envelope, admitted by the
//!   fused [`evm::EvmMonoDecorator`] (or the equivalent decorator chain)
//! - native transactions, admitted by the [`cosmos`] decorator chain with
//!   multi-mode signature verification, fee grants and an authz limiter
//!
//! # Features
//!
//! - EIP-1559 fee market with end-of-block base fee updates
//! - Global and node-local minimum gas price policies
//! - Bank/EVM balance views over one ledger with any coin decimals
//! - Per-block transient gas-wanted accounting
//! - In-memory keepers and fixtures for tests, behind the `testing` feature
//!
//! # Usage
//!
//! ```ignore
//! use evolve_ante::{AnteHandler, HandlerOptions};
//!
//! let handler = AnteHandler::new(config.apply(options))?;
//! handler.handle(&mut ctx, &tx, false)?;
//! ```

pub mod chain;
pub mod coins;
pub mod config;
pub mod context;
pub mod cosmos;
pub mod denom;
pub mod error;
pub mod evm;
pub mod feemarket;
pub mod fees;
pub mod handler;
pub mod keepers;
pub mod math;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod options;
pub mod signing;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tx;

pub use chain::{AnteChain, AnteDecorator};
pub use coins::{Coin, Coins, DecCoin, DecCoins};
pub use config::{load_config, load_config_from_str, AnteConfig};
pub use context::{AnteContext, BlockState, Event, ExecMode, GasMeter};
pub use denom::EvmCoinInfo;
pub use error::{AnteError, AnteResult, ConfigError, ErrorKind};
pub use feemarket::{calculate_base_fee, end_block, FeeMarketParams};
pub use fees::{check_global_fee, check_mempool_fee};
pub use handler::AnteHandler;
pub use keepers::{
    Account, AccountKeeper, BankKeeper, EvmAccount, EvmKeeper, EvmParams, ExtensionOptionChecker,
    FeeMarketKeeper, FeegrantKeeper,
};
pub use math::Dec;
pub use options::HandlerOptions;
pub use tx::{ExtensionOption, Fee, Msg, SignerInfo, Tx};
