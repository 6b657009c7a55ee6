//! Store collaborators consumed by the pipeline.
//!
//! Keepers take `&self`; implementations provide their own interior
//! mutability so they can be shared as `Arc<dyn Trait>`. Writes are
//! immediate. Atomic commit across a whole transaction is the job of the
//! store view the caller hands in.

use alloy_primitives::{b256, Address, B256, U256};

use crate::coins::{Coin, Coins};
use crate::context::AnteContext;
use crate::denom::EvmCoinInfo;
use crate::error::{AnteError, AnteResult};
use crate::feemarket::FeeMarketParams;
use crate::math::Dec;
use crate::signing::PubKey;
use crate::tx::Msg;

/// keccak256 of empty code: the code hash of every externally owned account.
pub const EMPTY_CODE_HASH: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Native account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub account_number: u64,
    pub sequence: u64,
    pub pub_key: Option<PubKey>,
}

/// Account as seen by the EVM: balances in 18-decimal units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmAccount {
    pub nonce: u64,
    pub balance: U256,
    pub code_hash: B256,
}

impl EvmAccount {
    pub fn empty() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code_hash: EMPTY_CODE_HASH,
        }
    }

    pub fn is_contract(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}

/// Chain configuration of the EVM module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmParams {
    /// EIP-155 chain id.
    pub chain_id: u64,
    pub coin_info: EvmCoinInfo,
    /// First height with London rules; `None` keeps London inactive.
    pub london_height: Option<u64>,
    pub allow_unprotected_txs: bool,
}

impl EvmParams {
    pub fn new(chain_id: u64, coin_info: EvmCoinInfo) -> Self {
        Self {
            chain_id,
            coin_info,
            london_height: Some(0),
            allow_unprotected_txs: false,
        }
    }

    pub fn is_london(&self, height: u64) -> bool {
        self.london_height.is_some_and(|london| height >= london)
    }
}

pub trait AccountKeeper: Send + Sync {
    fn get_account(&self, address: Address) -> Option<Account>;

    fn set_account(&self, account: Account);

    /// A fresh account with the next account number; not persisted.
    fn new_account_with_address(&self, address: Address) -> Account;

    fn get_sequence(&self, address: Address) -> AnteResult<u64> {
        self.get_account(address)
            .map(|account| account.sequence)
            .ok_or_else(|| AnteError::unknown_address(format!("account {address} does not exist")))
    }
}

/// Ledger of the base denomination(s).
pub trait BankKeeper: Send + Sync {
    fn balance(&self, address: Address, denom: &str) -> Coin;

    /// Part of the balance not locked; equal to the balance here.
    fn spendable_coin(&self, address: Address, denom: &str) -> Coin {
        self.balance(address, denom)
    }

    /// Move `amount` between accounts, all or nothing.
    fn send_coins(&self, from: Address, to: Address, amount: &Coins) -> AnteResult<()>;

    /// Move `fees` from `payer` to the fee collector, all or nothing.
    fn deduct_fees(&self, payer: Address, fees: &Coins) -> AnteResult<()>;

    fn set_balance(&self, address: Address, coin: Coin);
}

/// Fee market state: parameters, base fee and block gas wanted.
pub trait FeeMarketKeeper: Send + Sync {
    fn params(&self) -> FeeMarketParams;

    fn set_params(&self, params: FeeMarketParams);

    /// Current base fee in the bank denom.
    fn base_fee(&self) -> Dec;

    fn set_base_fee(&self, base_fee: Dec);

    /// Gas wanted of the previous block.
    fn block_gas_wanted(&self) -> u64;

    fn set_block_gas_wanted(&self, gas: u64);

    fn is_base_fee_enabled(&self, ctx: &AnteContext) -> bool {
        self.params().is_base_fee_enabled(ctx.block_height())
    }

    /// Add to the block's transient gas wanted, returning the new total.
    fn add_transient_gas_wanted(&self, ctx: &mut AnteContext, gas: u64) -> AnteResult<u64> {
        ctx.block.add_transient_gas_wanted(gas)
    }

    fn transient_gas_wanted(&self, ctx: &AnteContext) -> u64 {
        ctx.block.transient_gas_wanted()
    }
}

/// EVM module view over the same ledger.
pub trait EvmKeeper: Send + Sync {
    fn params(&self) -> EvmParams;

    /// Base fee in EVM units; `None` before London or without a base fee.
    fn base_fee(&self, ctx: &AnteContext) -> Option<U256>;

    fn get_account(&self, address: Address) -> Option<EvmAccount>;

    /// Spendable balance in EVM units.
    fn spendable_balance(&self, address: Address) -> U256;

    /// Charge `fees` (bank denom) to `from`, all or nothing.
    fn deduct_tx_costs_from_user_balance(&self, fees: &Coins, from: Address) -> AnteResult<()>;
}

/// Fee allowances granted by one account to another.
pub trait FeegrantKeeper: Send + Sync {
    fn use_granted_fees(
        &self,
        granter: Address,
        grantee: Address,
        fee: &Coins,
        msgs: &[Msg],
    ) -> AnteResult<()>;
}

/// Accepts or rejects a non-Ethereum extension option.
pub trait ExtensionOptionChecker: Send + Sync {
    fn accepts(&self, type_url: &str, value: &[u8]) -> bool;
}
