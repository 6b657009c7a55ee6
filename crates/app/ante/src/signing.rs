//! Signing modes, public keys and signature verification for native
//! transactions.
//!
//! A signer commits to the transaction through the sign bytes produced by a
//! [`SignModeHandler`] for its mode. Single keys are `eth_secp256k1`
//! (compressed SEC1, keccak256 digest, compact signature); multisig keys
//! nest further keys behind a threshold and each sub-signature is checked
//! with its own mode.

use alloy_primitives::{keccak256, Address};
use borsh::{BorshDeserialize, BorshSerialize};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};

use crate::context::GasMeter;
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::tx::Tx;

/// Gas charged per secp256k1 signature.
pub const SECP256K1_VERIFY_COST: u64 = 1000;

const EIP712_DOMAIN_NAME: &str = "Cosmos Web3";
const EIP712_DOMAIN_VERSION: &str = "1.0.0";

/// How a signer produced its sign bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum SignMode {
    Direct,
    LegacyAminoJson,
    /// Typed-data signature produced by an Ethereum wallet.
    Eip712,
}

/// Signing mode of one signer; multisig signers carry one mode per
/// selected sub-key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeInfo {
    Single(SignMode),
    Multi {
        /// One bit per sub-key; set bits select the keys that signed.
        bitarray: Vec<bool>,
        /// Mode of each selected sub-key, in key order.
        mode_infos: Vec<ModeInfo>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub enum PubKey {
    /// Compressed SEC1 secp256k1 key.
    EthSecp256k1(Vec<u8>),
    Multisig {
        threshold: u32,
        public_keys: Vec<PubKey>,
    },
}

impl PubKey {
    /// Account address controlled by this key.
    ///
    /// Single keys map to their Ethereum address; a multisig maps to the
    /// last 20 bytes of the keccak256 of its encoded form.
    pub fn address(&self) -> AnteResult<Address> {
        match self {
            PubKey::EthSecp256k1(bytes) => evolve_tx_eth::address_from_sec1_bytes(bytes)
                .map_err(|e| AnteError::new(ErrorKind::InvalidPubKey, e.to_string())),
            PubKey::Multisig { .. } => {
                let encoded = borsh::to_vec(self)
                    .map_err(|e| AnteError::new(ErrorKind::InvalidPubKey, e.to_string()))?;
                Ok(Address::from_word(keccak256(encoded)))
            }
        }
    }

    /// Number of single keys, counting multisig members recursively.
    pub fn key_count(&self) -> usize {
        match self {
            PubKey::EthSecp256k1(_) => 1,
            PubKey::Multisig { public_keys, .. } => public_keys.iter().map(PubKey::key_count).sum(),
        }
    }
}

/// Sub-signatures of a multisig signer, one per set bit.
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MultiSignature {
    pub signatures: Vec<Vec<u8>>,
}

impl MultiSignature {
    pub fn encode(&self) -> AnteResult<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| AnteError::invalid_request(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> AnteResult<Self> {
        borsh::from_slice(bytes).map_err(|e| {
            AnteError::new(
                ErrorKind::InvalidSignature,
                format!("failed to decode multisignature: {e}"),
            )
        })
    }
}

/// Per-signer values folded into the sign bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub address: Address,
}

/// Produces the bytes a signer commits to for a given mode.
pub trait SignModeHandler: Send + Sync {
    fn get_sign_bytes(&self, mode: SignMode, signer: &SignerData, tx: &Tx) -> AnteResult<Vec<u8>>;
}

/// Checks a single-key signature over sign bytes.
pub trait SignatureVerifier: Send + Sync {
    fn verify_signature(&self, pub_key: &[u8], sign_bytes: &[u8], signature: &[u8]) -> bool;
}

/// Charges the gas meter for verifying the signature(s) of one key.
pub trait SignatureGasConsumer: Send + Sync {
    fn consume_sig_gas(
        &self,
        meter: &mut GasMeter,
        pub_key: &PubKey,
        mode_info: Option<&ModeInfo>,
    ) -> AnteResult<()>;
}

#[derive(BorshSerialize)]
struct SignDoc {
    mode: SignMode,
    chain_id: String,
    account_number: u64,
    sequence: u64,
    signer: [u8; 20],
    body: Vec<u8>,
}

/// Borsh sign documents; EIP-712 wraps the document digest in the typed
/// data envelope `0x19 0x01 ‖ domain ‖ keccak256(doc)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSignModeHandler;

impl DefaultSignModeHandler {
    fn domain_separator(chain_id: &str) -> AnteResult<[u8; 32]> {
        let encoded = borsh::to_vec(&(EIP712_DOMAIN_NAME, EIP712_DOMAIN_VERSION, chain_id))
            .map_err(|e| AnteError::invalid_request(e.to_string()))?;
        Ok(keccak256(encoded).0)
    }
}

impl SignModeHandler for DefaultSignModeHandler {
    fn get_sign_bytes(&self, mode: SignMode, signer: &SignerData, tx: &Tx) -> AnteResult<Vec<u8>> {
        let doc = SignDoc {
            mode,
            chain_id: signer.chain_id.clone(),
            account_number: signer.account_number,
            sequence: signer.sequence,
            signer: signer.address.0 .0,
            body: tx.body_bytes()?,
        };
        let encoded = borsh::to_vec(&doc).map_err(|e| AnteError::invalid_request(e.to_string()))?;

        match mode {
            SignMode::Direct | SignMode::LegacyAminoJson => Ok(encoded),
            SignMode::Eip712 => {
                let mut bytes = Vec::with_capacity(66);
                bytes.extend_from_slice(&[0x19, 0x01]);
                bytes.extend_from_slice(&Self::domain_separator(&signer.chain_id)?);
                bytes.extend_from_slice(keccak256(&encoded).as_slice());
                Ok(bytes)
            }
        }
    }
}

/// `eth_secp256k1` verification: keccak256 of the sign bytes, compact
/// 64-byte signature (a trailing recovery byte is tolerated).
#[derive(Debug, Clone, Copy, Default)]
pub struct EthSecp256k1Verifier;

impl SignatureVerifier for EthSecp256k1Verifier {
    fn verify_signature(&self, pub_key: &[u8], sign_bytes: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(pub_key) else {
            return false;
        };
        let compact = match signature.len() {
            64 | 65 => signature.get(..64),
            _ => None,
        };
        let Some(Ok(signature)) = compact.map(Signature::from_slice) else {
            return false;
        };
        let digest = keccak256(sign_bytes);
        verifying_key
            .verify_prehash(digest.as_slice(), &signature)
            .is_ok()
    }
}

/// Flat cost per secp256k1 key; multisig keys charge each selected member.
#[derive(Debug, Clone, Copy)]
pub struct DefaultSigGasConsumer {
    pub secp256k1_cost: u64,
}

impl Default for DefaultSigGasConsumer {
    fn default() -> Self {
        Self {
            secp256k1_cost: SECP256K1_VERIFY_COST,
        }
    }
}

impl SignatureGasConsumer for DefaultSigGasConsumer {
    fn consume_sig_gas(
        &self,
        meter: &mut GasMeter,
        pub_key: &PubKey,
        mode_info: Option<&ModeInfo>,
    ) -> AnteResult<()> {
        match (pub_key, mode_info) {
            (PubKey::EthSecp256k1(_), _) => {
                meter.consume_gas(self.secp256k1_cost, "ante verify: eth_secp256k1")
            }
            (
                PubKey::Multisig { public_keys, .. },
                Some(ModeInfo::Multi {
                    bitarray,
                    mode_infos,
                }),
            ) => {
                let mut sub_modes = mode_infos.iter();
                for (key, selected) in public_keys.iter().zip(bitarray) {
                    if *selected {
                        self.consume_sig_gas(meter, key, sub_modes.next())?;
                    }
                }
                Ok(())
            }
            (PubKey::Multisig { public_keys, .. }, _) => {
                for key in public_keys {
                    self.consume_sig_gas(meter, key, None)?;
                }
                Ok(())
            }
        }
    }
}

/// Verify `signature` by `pub_key` over `tx`, recursing into multisig
/// members with their own modes.
pub fn verify_signature(
    handler: &dyn SignModeHandler,
    verifier: &dyn SignatureVerifier,
    pub_key: &PubKey,
    mode_info: &ModeInfo,
    signature: &[u8],
    signer: &SignerData,
    tx: &Tx,
) -> AnteResult<()> {
    match (pub_key, mode_info) {
        (PubKey::EthSecp256k1(key), ModeInfo::Single(mode)) => {
            let sign_bytes = handler.get_sign_bytes(*mode, signer, tx)?;
            if verifier.verify_signature(key, &sign_bytes, signature) {
                Ok(())
            } else {
                Err(AnteError::new(
                    ErrorKind::InvalidSignature,
                    format!("invalid {mode:?} signature"),
                ))
            }
        }
        (
            PubKey::Multisig {
                threshold,
                public_keys,
            },
            ModeInfo::Multi {
                bitarray,
                mode_infos,
            },
        ) => {
            if *threshold == 0 {
                return Err(AnteError::new(
                    ErrorKind::InvalidPubKey,
                    "multisig threshold must be positive",
                ));
            }
            if bitarray.len() != public_keys.len() {
                return Err(AnteError::new(
                    ErrorKind::InvalidSignature,
                    format!(
                        "bit array size is incorrect, expecting: {}, got: {}",
                        public_keys.len(),
                        bitarray.len()
                    ),
                ));
            }
            let selected = bitarray.iter().filter(|bit| **bit).count();
            if selected < *threshold as usize {
                return Err(AnteError::new(
                    ErrorKind::InvalidSignature,
                    format!("not enough signatures set, have {selected}, expected {threshold}"),
                ));
            }
            let multi = MultiSignature::decode(signature)?;
            if multi.signatures.len() != selected || mode_infos.len() != selected {
                return Err(AnteError::new(
                    ErrorKind::InvalidSignature,
                    format!(
                        "signature count mismatch: {} signatures and {} modes for {selected} set bits",
                        multi.signatures.len(),
                        mode_infos.len()
                    ),
                ));
            }

            let mut sub = multi.signatures.iter().zip(mode_infos);
            for (key, set) in public_keys.iter().zip(bitarray) {
                if !*set {
                    continue;
                }
                let Some((sub_sig, sub_mode)) = sub.next() else {
                    break;
                };
                verify_signature(handler, verifier, key, sub_mode, sub_sig, signer, tx)?;
            }
            Ok(())
        }
        _ => Err(AnteError::new(
            ErrorKind::InvalidPubKey,
            "mode info does not match public key type",
        )),
    }
}
