//! Deterministic signers and an in-memory keeper set for exercising the
//! pipeline, here and in downstream crates.
//!
//! Only compiled for tests and with the `testing` feature. Helpers panic
//! on broken fixtures instead of returning errors.

use std::sync::Arc;

use alloy_consensus::{SignableTransaction, Signed, TxEip1559, TxLegacy};
use alloy_primitives::{keccak256, Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use evolve_tx_eth::{MsgEthereumTx, TxData};
use k256::ecdsa::{RecoveryId, Signature, SigningKey};

use crate::coins::{Coin, Coins};
use crate::config::AnteConfig;
use crate::context::{AnteContext, BlockState, ExecMode};
use crate::cosmos::DynamicFeeExtensionChecker;
use crate::denom::EvmCoinInfo;
use crate::evm::{EvmMonoDecorator, EvmTxEnv};
use crate::feemarket::FeeMarketParams;
use crate::keepers::{AccountKeeper, BankKeeper, EvmKeeper, EvmParams};
use crate::memory::{
    MemoryAccountKeeper, MemoryBankKeeper, MemoryEvmKeeper, MemoryFeeMarketKeeper,
    MemoryFeegrantKeeper,
};
use crate::options::HandlerOptions;
use crate::signing::{
    DefaultSigGasConsumer, DefaultSignModeHandler, EthSecp256k1Verifier, ModeInfo, PubKey,
    SignMode, SignModeHandler, SignerData,
};
use crate::tx::{SignerInfo, Tx};

/// EIP-155 chain id of the fixtures.
pub const TEST_EVM_CHAIN_ID: u64 = 9000;
pub const TEST_CHAIN_ID: &str = "evolve_9000-1";
pub const TEST_DENOM: &str = "aevm";
pub const TEST_BLOCK_HEIGHT: u64 = 1;
pub const TEST_BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Recipient of the fixture transactions.
pub const TEST_RECIPIENT: Address = Address::new([0x42; 20]);

/// A secp256k1 key derived from a one-byte seed.
#[derive(Clone)]
pub struct TestSigner {
    key: SigningKey,
}

impl TestSigner {
    /// # Panics
    ///
    /// If `[seed; 32]` is not a valid scalar, i.e. for 0 and 0xff.
    pub fn new(seed: u8) -> Self {
        match SigningKey::from_slice(&[seed; 32]) {
            Ok(key) => Self { key },
            Err(err) => panic!("seed {seed} is not a valid secp256k1 key: {err}"),
        }
    }

    pub fn pub_key(&self) -> PubKey {
        let point = self.key.verifying_key().to_encoded_point(true);
        PubKey::EthSecp256k1(point.as_bytes().to_vec())
    }

    pub fn address(&self) -> Address {
        match self.pub_key().address() {
            Ok(address) => address,
            Err(err) => panic!("secp256k1 key without an address: {err}"),
        }
    }

    fn sign_prehash(&self, hash: &[u8]) -> (Signature, RecoveryId) {
        match self.key.sign_prehash_recoverable(hash) {
            Ok(signed) => signed,
            Err(err) => panic!("signing a 32-byte prehash failed: {err}"),
        }
    }

    fn sign_hash(&self, hash: B256) -> PrimitiveSignature {
        let (signature, recovery_id) = self.sign_prehash(hash.as_slice());
        let r = U256::from_be_slice(&signature.r().to_bytes());
        let s = U256::from_be_slice(&signature.s().to_bytes());
        PrimitiveSignature::new(r, s, recovery_id.is_y_odd())
    }

    /// Compact signature over keccak256 of `bytes`.
    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let (signature, _) = self.sign_prehash(keccak256(bytes).as_slice());
        signature.to_bytes().to_vec()
    }

    /// Signature over the sign bytes of `tx` for `mode`.
    ///
    /// # Panics
    ///
    /// If the sign bytes cannot be encoded.
    pub fn sign_for(&self, mode: SignMode, signer: &SignerData, tx: &Tx) -> Vec<u8> {
        match DefaultSignModeHandler.get_sign_bytes(mode, signer, tx) {
            Ok(sign_bytes) => self.sign(&sign_bytes),
            Err(err) => panic!("encoding {mode:?} sign bytes failed: {err}"),
        }
    }

    pub fn sign_legacy(&self, tx: TxLegacy) -> TxData {
        let signature = self.sign_hash(tx.signature_hash());
        tx.into_signed(signature).into()
    }

    /// Sign `tx` and wrap it with this signer as declared sender.
    pub fn eth_msg<T>(&self, tx: T) -> MsgEthereumTx
    where
        T: SignableTransaction<PrimitiveSignature>,
        Signed<T>: Into<TxData>,
    {
        let signature = self.sign_hash(tx.signature_hash());
        MsgEthereumTx::new(tx.into_signed(signature).into(), self.address())
    }
}

/// A protected legacy transfer to [`TEST_RECIPIENT`].
pub fn legacy_tx(nonce: u64, gas_price: u128, gas_limit: u64, value: U256) -> TxLegacy {
    TxLegacy {
        chain_id: Some(TEST_EVM_CHAIN_ID),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Call(TEST_RECIPIENT),
        value,
        input: Bytes::new(),
    }
}

/// An EIP-1559 transfer to [`TEST_RECIPIENT`].
pub fn dynamic_fee_tx(
    nonce: u64,
    max_fee_per_gas: u128,
    max_priority_fee_per_gas: u128,
    gas_limit: u64,
    value: U256,
) -> TxEip1559 {
    TxEip1559 {
        chain_id: TEST_EVM_CHAIN_ID,
        nonce,
        gas_limit,
        max_fee_per_gas,
        max_priority_fee_per_gas,
        to: TxKind::Call(TEST_RECIPIENT),
        value,
        access_list: Default::default(),
        input: Bytes::new(),
    }
}

/// In-memory keepers wired together the way a node wires its stores.
pub struct AnteFixture {
    pub accounts: Arc<MemoryAccountKeeper>,
    pub bank: Arc<MemoryBankKeeper>,
    pub fee_market: Arc<MemoryFeeMarketKeeper>,
    pub evm: Arc<MemoryEvmKeeper>,
    pub feegrant: Arc<MemoryFeegrantKeeper>,
}

impl Default for AnteFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl AnteFixture {
    /// London active from genesis, default fee market.
    pub fn new() -> Self {
        Self::with_params(
            EvmParams::new(TEST_EVM_CHAIN_ID, EvmCoinInfo::eighteen_decimals(TEST_DENOM)),
            FeeMarketParams::default(),
        )
    }

    /// London never activates, so no base fee applies.
    pub fn pre_london() -> Self {
        let mut params = EvmParams::new(TEST_EVM_CHAIN_ID, EvmCoinInfo::eighteen_decimals(TEST_DENOM));
        params.london_height = None;
        Self::with_params(params, FeeMarketParams::default())
    }

    /// Keepers set up from a loaded configuration.
    pub fn from_config(config: &AnteConfig) -> Self {
        let fixture = Self::with_params(config.evm_params(), FeeMarketParams::default());
        config.init_fee_market(fixture.fee_market.as_ref());
        fixture
    }

    pub fn with_params(evm_params: EvmParams, fee_market_params: FeeMarketParams) -> Self {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let fee_market = Arc::new(MemoryFeeMarketKeeper::new(fee_market_params));
        let evm = Arc::new(MemoryEvmKeeper::new(
            evm_params,
            accounts.clone(),
            bank.clone(),
            fee_market.clone(),
        ));
        Self {
            accounts,
            bank,
            fee_market,
            evm,
            feegrant: Arc::new(MemoryFeegrantKeeper::new()),
        }
    }

    pub fn coin_info(&self) -> EvmCoinInfo {
        self.evm.params().coin_info
    }

    /// Context at [`TEST_BLOCK_HEIGHT`] with a fresh block state.
    pub fn context(&self, mode: ExecMode) -> AnteContext {
        AnteContext::new(TEST_CHAIN_ID, TEST_BLOCK_HEIGHT, mode)
            .with_block_state(BlockState::begin_block(Some(TEST_BLOCK_GAS_LIMIT)))
    }

    pub fn evm_env(&self, ctx: &AnteContext) -> EvmTxEnv {
        EvmTxEnv::load(ctx, self.evm.as_ref(), self.fee_market.as_ref())
    }

    /// Set the bank balance of `address` in the EVM coin's bank denom.
    pub fn fund(&self, address: Address, amount: U256) {
        self.bank
            .set_balance(address, Coin::new(self.coin_info().denom, amount));
    }

    pub fn create_funded_account(&self, address: Address, amount: U256) {
        let account = self.accounts.new_account_with_address(address);
        self.accounts.set_account(account);
        self.fund(address, amount);
    }

    /// Wrap `msgs` with the fee the envelope expects.
    pub fn eth_tx(&self, msgs: Vec<MsgEthereumTx>) -> Tx {
        let coin_info = self.coin_info();
        let fee = msgs.iter().fold(U256::ZERO, |total, msg| {
            total.saturating_add(msg.data().fee().unwrap_or_default())
        });
        Tx::ethereum(
            msgs,
            Coins::single(coin_info.denom.clone(), coin_info.from_evm_ceil(fee)),
        )
    }

    /// Sign `tx` by every signer, each with a single-key mode, at its
    /// current account number and sequence.
    ///
    /// # Panics
    ///
    /// If a signer has no account.
    pub fn sign_tx(&self, ctx: &AnteContext, tx: &mut Tx, signers: &[(&TestSigner, SignMode)]) {
        tx.signer_infos.clear();
        tx.signatures.clear();
        for (signer, mode) in signers {
            let Some(account) = self.accounts.get_account(signer.address()) else {
                panic!("signer {} has no account", signer.address());
            };
            let signer_data = SignerData {
                chain_id: ctx.chain_id().to_string(),
                account_number: account.account_number,
                sequence: account.sequence,
                address: signer.address(),
            };
            tx.signer_infos.push(SignerInfo {
                public_key: Some(signer.pub_key()),
                mode_info: ModeInfo::Single(*mode),
                sequence: account.sequence,
            });
            let signature = signer.sign_for(*mode, &signer_data, tx);
            tx.signatures.push(signature);
        }
    }

    pub fn mono(&self) -> EvmMonoDecorator {
        EvmMonoDecorator::new(
            self.accounts.clone(),
            self.evm.clone(),
            self.fee_market.clone(),
            0,
        )
    }

    /// Every collaborator set, fee grants enabled, the dynamic fee
    /// extension option accepted.
    pub fn handler_options(&self) -> HandlerOptions {
        HandlerOptions::new()
            .account_keeper(self.accounts.clone())
            .bank_keeper(self.bank.clone())
            .evm_keeper(self.evm.clone())
            .fee_market_keeper(self.fee_market.clone())
            .sign_mode_handler(Arc::new(DefaultSignModeHandler))
            .signature_verifier(Arc::new(EthSecp256k1Verifier))
            .sig_gas_consumer(Arc::new(DefaultSigGasConsumer::default()))
            .feegrant_keeper(self.feegrant.clone())
            .extension_option_checker(Arc::new(DynamicFeeExtensionChecker))
    }
}
