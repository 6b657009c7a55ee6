//! Typed transaction payloads carried by an Ethereum message.

use alloy_consensus::{Signed, TxEip1559, TxEip2930, TxLegacy};
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{keccak256, Address, Bytes, PrimitiveSignature, B256, U256};

use crate::error::{TxError, TxResult};
use crate::recovery::recover_sender_from_signature_hash;

/// Transaction type constants per EIP-2718.
pub mod tx_type {
    /// Legacy transaction (pre-EIP-2718).
    pub const LEGACY: u8 = 0x00;
    /// EIP-2930 access list transaction.
    pub const ACCESS_LIST: u8 = 0x01;
    /// EIP-1559 dynamic fee transaction.
    pub const DYNAMIC_FEE: u8 = 0x02;
}

/// Signed payload of an Ethereum message.
///
/// Every variant exposes the same accessor set so fee math does not need to
/// branch on the type: legacy and access-list transactions report their gas
/// price as both fee cap and tip cap.
#[derive(Clone, Debug, PartialEq)]
pub enum TxData {
    /// Legacy transaction, optionally EIP-155 protected.
    Legacy(Signed<TxLegacy>),
    /// EIP-2930 access list transaction (type 0x01).
    AccessList(Signed<TxEip2930>),
    /// EIP-1559 dynamic fee transaction (type 0x02).
    DynamicFee(Signed<TxEip1559>),
}

impl From<Signed<TxLegacy>> for TxData {
    fn from(signed: Signed<TxLegacy>) -> Self {
        TxData::Legacy(signed)
    }
}

impl From<Signed<TxEip2930>> for TxData {
    fn from(signed: Signed<TxEip2930>) -> Self {
        TxData::AccessList(signed)
    }
}

impl From<Signed<TxEip1559>> for TxData {
    fn from(signed: Signed<TxEip1559>) -> Self {
        TxData::DynamicFee(signed)
    }
}

impl TxData {
    /// Decode an EIP-2718 encoded transaction.
    ///
    /// Legacy transactions start with an RLP list prefix (0xc0..=0xff);
    /// typed transactions start with their type byte.
    pub fn decode(bytes: &[u8]) -> TxResult<Self> {
        let (&first_byte, payload) = bytes.split_first().ok_or(TxError::EmptyInput)?;

        let mut cursor = payload;
        let tx = if first_byte >= 0xc0 {
            cursor = bytes;
            TxData::Legacy(Signed::<TxLegacy>::rlp_decode(&mut cursor).map_err(|_| TxError::Decode)?)
        } else {
            match first_byte {
                tx_type::ACCESS_LIST => TxData::AccessList(
                    Signed::<TxEip2930>::rlp_decode(&mut cursor).map_err(|_| TxError::Decode)?,
                ),
                tx_type::DYNAMIC_FEE => TxData::DynamicFee(
                    Signed::<TxEip1559>::rlp_decode(&mut cursor).map_err(|_| TxError::Decode)?,
                ),
                ty => return Err(TxError::UnsupportedTxType(ty)),
            }
        };

        if !cursor.is_empty() {
            return Err(TxError::Decode);
        }
        Ok(tx)
    }

    /// Encode to the same format [`TxData::decode`] accepts.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            TxData::Legacy(tx) => tx.rlp_encode(&mut buf),
            TxData::AccessList(tx) => {
                buf.push(tx_type::ACCESS_LIST);
                tx.rlp_encode(&mut buf);
            }
            TxData::DynamicFee(tx) => {
                buf.push(tx_type::DYNAMIC_FEE);
                tx.rlp_encode(&mut buf);
            }
        }
        buf
    }

    /// Transaction hash: keccak256 of the EIP-2718 encoding.
    pub fn tx_hash(&self) -> B256 {
        keccak256(self.encode())
    }

    pub fn tx_type(&self) -> u8 {
        match self {
            TxData::Legacy(_) => tx_type::LEGACY,
            TxData::AccessList(_) => tx_type::ACCESS_LIST,
            TxData::DynamicFee(_) => tx_type::DYNAMIC_FEE,
        }
    }

    /// Chain id the signature commits to. `None` for unprotected legacy txs.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            TxData::Legacy(tx) => tx.tx().chain_id,
            TxData::AccessList(tx) => Some(tx.tx().chain_id),
            TxData::DynamicFee(tx) => Some(tx.tx().chain_id),
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            TxData::Legacy(tx) => tx.tx().nonce,
            TxData::AccessList(tx) => tx.tx().nonce,
            TxData::DynamicFee(tx) => tx.tx().nonce,
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            TxData::Legacy(tx) => tx.tx().gas_limit,
            TxData::AccessList(tx) => tx.tx().gas_limit,
            TxData::DynamicFee(tx) => tx.tx().gas_limit,
        }
    }

    /// Gas price for legacy/access-list txs, fee cap for dynamic fee txs.
    pub fn gas_price(&self) -> U256 {
        match self {
            TxData::Legacy(tx) => U256::from(tx.tx().gas_price),
            TxData::AccessList(tx) => U256::from(tx.tx().gas_price),
            TxData::DynamicFee(tx) => U256::from(tx.tx().max_fee_per_gas),
        }
    }

    pub fn gas_fee_cap(&self) -> U256 {
        self.gas_price()
    }

    pub fn gas_tip_cap(&self) -> U256 {
        match self {
            TxData::DynamicFee(tx) => U256::from(tx.tx().max_priority_fee_per_gas),
            _ => self.gas_price(),
        }
    }

    /// Recipient, `None` for contract creation.
    pub fn to(&self) -> Option<Address> {
        match self {
            TxData::Legacy(tx) => tx.tx().to.to().copied(),
            TxData::AccessList(tx) => tx.tx().to.to().copied(),
            TxData::DynamicFee(tx) => tx.tx().to.to().copied(),
        }
    }

    pub fn is_contract_creation(&self) -> bool {
        self.to().is_none()
    }

    pub fn value(&self) -> U256 {
        match self {
            TxData::Legacy(tx) => tx.tx().value,
            TxData::AccessList(tx) => tx.tx().value,
            TxData::DynamicFee(tx) => tx.tx().value,
        }
    }

    pub fn input(&self) -> &Bytes {
        match self {
            TxData::Legacy(tx) => &tx.tx().input,
            TxData::AccessList(tx) => &tx.tx().input,
            TxData::DynamicFee(tx) => &tx.tx().input,
        }
    }

    pub fn access_list(&self) -> Option<&AccessList> {
        match self {
            TxData::Legacy(_) => None,
            TxData::AccessList(tx) => Some(&tx.tx().access_list),
            TxData::DynamicFee(tx) => Some(&tx.tx().access_list),
        }
    }

    pub fn signature(&self) -> &PrimitiveSignature {
        match self {
            TxData::Legacy(tx) => tx.signature(),
            TxData::AccessList(tx) => tx.signature(),
            TxData::DynamicFee(tx) => tx.signature(),
        }
    }

    /// Digest the signature was produced over.
    pub fn signature_hash(&self) -> B256 {
        match self {
            TxData::Legacy(tx) => tx.signature_hash(),
            TxData::AccessList(tx) => tx.signature_hash(),
            TxData::DynamicFee(tx) => tx.signature_hash(),
        }
    }

    /// Recover the signer from the signature.
    pub fn recover_sender(&self) -> TxResult<Address> {
        recover_sender_from_signature_hash(self.signature_hash(), self.signature())
    }

    /// `gas_price * gas_limit` (fee cap for dynamic fee txs).
    pub fn fee(&self) -> TxResult<U256> {
        self.gas_price()
            .checked_mul(U256::from(self.gas_limit()))
            .ok_or(TxError::FeeOverflow)
    }

    /// Maximum amount the sender can be charged: `fee + value`.
    pub fn cost(&self) -> TxResult<U256> {
        self.fee()?
            .checked_add(self.value())
            .ok_or(TxError::FeeOverflow)
    }

    /// Price actually paid per unit of gas given the block base fee.
    ///
    /// With a base fee this is `min(tip_cap + base_fee, fee_cap)`; for
    /// legacy transactions that always resolves to the gas price.
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match base_fee {
            Some(base_fee) => self
                .gas_tip_cap()
                .saturating_add(base_fee)
                .min(self.gas_fee_cap()),
            None => self.gas_price(),
        }
    }

    pub fn effective_fee(&self, base_fee: Option<U256>) -> TxResult<U256> {
        self.effective_gas_price(base_fee)
            .checked_mul(U256::from(self.gas_limit()))
            .ok_or(TxError::FeeOverflow)
    }

    pub fn effective_cost(&self, base_fee: Option<U256>) -> TxResult<U256> {
        self.effective_fee(base_fee)?
            .checked_add(self.value())
            .ok_or(TxError::FeeOverflow)
    }

    /// Tip per gas left for the block producer once the base fee is burnt.
    pub fn effective_tip(&self, base_fee: Option<U256>) -> U256 {
        match base_fee {
            Some(base_fee) => self
                .gas_tip_cap()
                .min(self.gas_fee_cap().saturating_sub(base_fee)),
            None => self.gas_tip_cap(),
        }
    }
}
