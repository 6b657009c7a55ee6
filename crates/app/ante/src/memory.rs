//! In-memory keepers for tests and embedding.
//!
//! Each keeper guards its maps with a `parking_lot::RwLock`; the EVM keeper
//! is a view over the account and bank keepers rather than a separate
//! ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};
use parking_lot::RwLock;

use crate::coins::{Coin, Coins};
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::feemarket::FeeMarketParams;
use crate::keepers::{
    Account, AccountKeeper, BankKeeper, EvmAccount, EvmKeeper, EvmParams, FeeMarketKeeper,
    FeegrantKeeper, EMPTY_CODE_HASH,
};
use crate::math::Dec;
use crate::tx::Msg;

/// Name of the module account collecting transaction fees.
pub const FEE_COLLECTOR: &str = "fee_collector";

/// Address of a module account.
pub fn module_address(name: &str) -> Address {
    Address::from_word(keccak256(name.as_bytes()))
}

#[derive(Debug, Default)]
struct AccountStore {
    accounts: BTreeMap<Address, Account>,
    next_account_number: u64,
}

#[derive(Debug, Default)]
pub struct MemoryAccountKeeper {
    store: RwLock<AccountStore>,
}

impl MemoryAccountKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.store.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccountKeeper for MemoryAccountKeeper {
    fn get_account(&self, address: Address) -> Option<Account> {
        self.store.read().accounts.get(&address).cloned()
    }

    fn set_account(&self, account: Account) {
        let mut store = self.store.write();
        if account.account_number >= store.next_account_number {
            store.next_account_number = account.account_number.saturating_add(1);
        }
        store.accounts.insert(account.address, account);
    }

    fn new_account_with_address(&self, address: Address) -> Account {
        let mut store = self.store.write();
        let account_number = store.next_account_number;
        store.next_account_number = account_number.saturating_add(1);
        Account {
            address,
            account_number,
            sequence: 0,
            pub_key: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBankKeeper {
    balances: RwLock<BTreeMap<(Address, String), U256>>,
}

impl MemoryBankKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    fn transfer(&self, from: Address, to: Address, amount: &Coins) -> AnteResult<()> {
        let mut balances = self.balances.write();
        for coin in amount.iter() {
            let have = balances
                .get(&(from, coin.denom.clone()))
                .copied()
                .unwrap_or_default();
            if have < coin.amount {
                return Err(AnteError::insufficient_funds(format!(
                    "spendable balance {have}{} is smaller than {coin}",
                    coin.denom
                )));
            }
        }
        for coin in amount.iter() {
            let from_key = (from, coin.denom.clone());
            let from_balance = balances.get(&from_key).copied().unwrap_or_default();
            balances.insert(from_key, from_balance.saturating_sub(coin.amount));

            let to_key = (to, coin.denom.clone());
            let to_balance = balances.get(&to_key).copied().unwrap_or_default();
            balances.insert(to_key, to_balance.saturating_add(coin.amount));
        }
        Ok(())
    }
}

impl BankKeeper for MemoryBankKeeper {
    fn balance(&self, address: Address, denom: &str) -> Coin {
        let amount = self
            .balances
            .read()
            .get(&(address, denom.to_string()))
            .copied()
            .unwrap_or_default();
        Coin::new(denom, amount)
    }

    fn send_coins(&self, from: Address, to: Address, amount: &Coins) -> AnteResult<()> {
        self.transfer(from, to, amount)
    }

    fn deduct_fees(&self, payer: Address, fees: &Coins) -> AnteResult<()> {
        self.transfer(payer, module_address(FEE_COLLECTOR), fees)
    }

    fn set_balance(&self, address: Address, coin: Coin) {
        self.balances
            .write()
            .insert((address, coin.denom), coin.amount);
    }
}

#[derive(Debug)]
struct FeeMarketState {
    params: FeeMarketParams,
    base_fee: Dec,
    block_gas_wanted: u64,
}

#[derive(Debug)]
pub struct MemoryFeeMarketKeeper {
    state: RwLock<FeeMarketState>,
}

impl MemoryFeeMarketKeeper {
    /// Starts from the configured base fee.
    pub fn new(params: FeeMarketParams) -> Self {
        let base_fee = params.base_fee;
        Self {
            state: RwLock::new(FeeMarketState {
                params,
                base_fee,
                block_gas_wanted: 0,
            }),
        }
    }
}

impl Default for MemoryFeeMarketKeeper {
    fn default() -> Self {
        Self::new(FeeMarketParams::default())
    }
}

impl FeeMarketKeeper for MemoryFeeMarketKeeper {
    fn params(&self) -> FeeMarketParams {
        self.state.read().params.clone()
    }

    fn set_params(&self, params: FeeMarketParams) {
        self.state.write().params = params;
    }

    fn base_fee(&self) -> Dec {
        self.state.read().base_fee
    }

    fn set_base_fee(&self, base_fee: Dec) {
        self.state.write().base_fee = base_fee;
    }

    fn block_gas_wanted(&self) -> u64 {
        self.state.read().block_gas_wanted
    }

    fn set_block_gas_wanted(&self, gas: u64) {
        self.state.write().block_gas_wanted = gas;
    }
}

/// EVM view over the account and bank keepers.
pub struct MemoryEvmKeeper {
    params: RwLock<EvmParams>,
    accounts: Arc<dyn AccountKeeper>,
    bank: Arc<dyn BankKeeper>,
    fee_market: Arc<dyn FeeMarketKeeper>,
    code_hashes: RwLock<BTreeMap<Address, B256>>,
}

impl MemoryEvmKeeper {
    pub fn new(
        params: EvmParams,
        accounts: Arc<dyn AccountKeeper>,
        bank: Arc<dyn BankKeeper>,
        fee_market: Arc<dyn FeeMarketKeeper>,
    ) -> Self {
        Self {
            params: RwLock::new(params),
            accounts,
            bank,
            fee_market,
            code_hashes: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn set_params(&self, params: EvmParams) {
        *self.params.write() = params;
    }

    /// Mark `address` as holding code.
    pub fn set_code_hash(&self, address: Address, code_hash: B256) {
        self.code_hashes.write().insert(address, code_hash);
    }
}

impl EvmKeeper for MemoryEvmKeeper {
    fn params(&self) -> EvmParams {
        self.params.read().clone()
    }

    fn base_fee(&self, ctx: &AnteContext) -> Option<U256> {
        let params = self.params.read();
        if !params.is_london(ctx.block_height()) || !self.fee_market.is_base_fee_enabled(ctx) {
            return None;
        }
        Some(
            params
                .coin_info
                .dec_to_evm(self.fee_market.base_fee())
                .truncate(),
        )
    }

    fn get_account(&self, address: Address) -> Option<EvmAccount> {
        let account = self.accounts.get_account(address)?;
        let code_hash = self
            .code_hashes
            .read()
            .get(&address)
            .copied()
            .unwrap_or(EMPTY_CODE_HASH);
        Some(EvmAccount {
            nonce: account.sequence,
            balance: self.spendable_balance(address),
            code_hash,
        })
    }

    fn spendable_balance(&self, address: Address) -> U256 {
        let coin_info = self.params.read().coin_info.clone();
        let coin = self.bank.spendable_coin(address, &coin_info.denom);
        coin_info.to_evm(coin.amount)
    }

    fn deduct_tx_costs_from_user_balance(&self, fees: &Coins, from: Address) -> AnteResult<()> {
        if fees.is_zero() {
            return Ok(());
        }
        self.bank.deduct_fees(from, fees)
    }
}

#[derive(Debug, Default)]
pub struct MemoryFeegrantKeeper {
    allowances: RwLock<BTreeMap<(Address, Address), Coins>>,
}

impl MemoryFeegrantKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `grantee` to spend up to `spend_limit` of `granter`'s funds on fees.
    pub fn grant_allowance(&self, granter: Address, grantee: Address, spend_limit: Coins) {
        self.allowances
            .write()
            .insert((granter, grantee), spend_limit);
    }

    pub fn allowance(&self, granter: Address, grantee: Address) -> Option<Coins> {
        self.allowances.read().get(&(granter, grantee)).cloned()
    }
}

impl FeegrantKeeper for MemoryFeegrantKeeper {
    fn use_granted_fees(
        &self,
        granter: Address,
        grantee: Address,
        fee: &Coins,
        _msgs: &[Msg],
    ) -> AnteResult<()> {
        let mut allowances = self.allowances.write();
        let Some(limit) = allowances.get(&(granter, grantee)) else {
            return Err(AnteError::unauthorized(format!(
                "fee-grant not found: granter {granter}, grantee {grantee}"
            )));
        };
        if !limit.is_all_gte(fee) {
            return Err(AnteError::insufficient_funds(format!(
                "basic allowance: fee limit exceeded; {fee} > {limit}"
            )));
        }
        let remaining = Coins::new(limit.iter().map(|coin| {
            Coin::new(
                coin.denom.clone(),
                coin.amount.saturating_sub(fee.amount_of(&coin.denom)),
            )
        }))
        .unwrap_or_default();
        allowances.insert((granter, grantee), remaining);
        Ok(())
    }
}
