//! The Ethereum message wrapped inside a native transaction.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, B256, U256};

use crate::chain_id::ChainIdPolicy;
use crate::error::{TxError, TxResult};
use crate::tx_data::{tx_type, TxData};

/// Type URL identifying [`MsgEthereumTx`] among native messages.
pub const MSG_ETHEREUM_TX_TYPE_URL: &str = "/cosmos.evm.vm.v1.MsgEthereumTx";

/// A signed Ethereum transaction plus its denormalized sender.
///
/// `from` is supplied by whoever wrapped the transaction and is only trusted
/// after [`MsgEthereumTx::verify_sender`] succeeds.
#[derive(Clone, Debug, PartialEq)]
pub struct MsgEthereumTx {
    data: TxData,
    from: Address,
    hash: B256,
}

impl MsgEthereumTx {
    /// Wrap `data` with an explicitly declared sender.
    pub fn new(data: TxData, from: Address) -> Self {
        let hash = data.tx_hash();
        Self { data, from, hash }
    }

    /// Wrap `data`, recovering the sender from its signature.
    pub fn from_signed(data: TxData) -> TxResult<Self> {
        let from = data.recover_sender()?;
        Ok(Self::new(data, from))
    }

    /// Decode EIP-2718 bytes and recover the sender.
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        Self::from_signed(TxData::decode(bytes)?)
    }

    /// Override the cached hash, as a wire-decoded message might carry.
    pub fn with_hash(mut self, hash: B256) -> Self {
        self.hash = hash;
        self
    }

    pub fn data(&self) -> &TxData {
        &self.data
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    pub fn gas(&self) -> u64 {
        self.data.gas_limit()
    }

    /// Stateless checks: sender present, sane gas, consistent fee caps and
    /// a hash matching the payload.
    pub fn validate_basic(&self) -> TxResult<()> {
        if self.from == Address::ZERO {
            return Err(TxError::MissingSender);
        }

        let gas = self.data.gas_limit();
        if gas == 0 {
            return Err(TxError::ZeroGasLimit);
        }
        if i64::try_from(gas).is_err() {
            return Err(TxError::GasOverflow(gas));
        }

        if let TxData::DynamicFee(tx) = &self.data {
            let inner = tx.tx();
            if inner.max_priority_fee_per_gas > inner.max_fee_per_gas {
                return Err(TxError::TipAboveFeeCap {
                    tip_cap: inner.max_priority_fee_per_gas,
                    fee_cap: inner.max_fee_per_gas,
                });
            }
        }

        let expected = self.data.tx_hash();
        if self.hash != expected {
            return Err(TxError::HashMismatch {
                got: self.hash,
                expected,
            });
        }
        Ok(())
    }

    /// Check replay protection and that the signature recovers to `from`.
    pub fn verify_sender(&self, policy: &ChainIdPolicy) -> TxResult<()> {
        policy.verify(self.data.chain_id())?;

        let recovered = self.data.recover_sender()?;
        if recovered != self.from {
            tracing::debug!(
                recovered = %recovered,
                declared = %self.from,
                tx_hash = %self.hash,
                "ethereum tx sender mismatch"
            );
            return Err(TxError::SenderMismatch {
                recovered,
                declared: self.from,
            });
        }
        Ok(())
    }

    /// Execution view of the message at the given base fee.
    pub fn as_message(&self, base_fee: Option<U256>) -> CoreMessage {
        CoreMessage {
            from: self.from,
            to: self.data.to(),
            nonce: self.data.nonce(),
            value: self.data.value(),
            gas_limit: self.data.gas_limit(),
            gas_price: self.data.effective_gas_price(base_fee),
            gas_fee_cap: self.data.gas_fee_cap(),
            gas_tip_cap: self.data.gas_tip_cap(),
            data: self.data.input().clone(),
            access_list: self.data.access_list().cloned().unwrap_or_default(),
            is_dynamic_fee: self.data.tx_type() == tx_type::DYNAMIC_FEE,
        }
    }
}

/// Message as seen by the EVM: prices resolved against the base fee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreMessage {
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    /// Effective gas price.
    pub gas_price: U256,
    pub gas_fee_cap: U256,
    pub gas_tip_cap: U256,
    pub data: Bytes,
    pub access_list: AccessList,
    pub is_dynamic_fee: bool,
}

impl CoreMessage {
    /// `gas_limit * gas_price + value`, or `None` on overflow.
    pub fn max_spend(&self) -> Option<U256> {
        self.gas_price
            .checked_mul(U256::from(self.gas_limit))?
            .checked_add(self.value)
    }
}
