//! Sender recovery for secp256k1 Ethereum signatures.

use alloy_primitives::{keccak256, Address, PrimitiveSignature, B256};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1};
use std::sync::OnceLock;

use crate::error::{TxError, TxResult};

/// Recover the address that produced `signature` over `signature_hash`.
///
/// The hash must already be the signer-specific digest (EIP-155 for
/// protected legacy txs, the EIP-2718 payload hash for typed txs).
pub fn recover_sender_from_signature_hash(
    signature_hash: B256,
    signature: &PrimitiveSignature,
) -> TxResult<Address> {
    let mut compact = [0u8; 64];
    let r = signature.r().to_be_bytes::<32>();
    let s = signature.s().to_be_bytes::<32>();
    compact[..32].copy_from_slice(&r);
    compact[32..].copy_from_slice(&s);

    let recid = RecoveryId::from_i32(i32::from(signature.v()))
        .map_err(|_| TxError::SignatureRecovery)?;
    let recoverable = RecoverableSignature::from_compact(&compact, recid)
        .map_err(|_| TxError::SignatureRecovery)?;

    let msg = Message::from_digest_slice(signature_hash.as_slice())
        .map_err(|_| TxError::SignatureRecovery)?;
    let pubkey = secp()
        .recover_ecdsa(&msg, &recoverable)
        .map_err(|_| TxError::SignatureRecovery)?;
    address_from_public_key(&pubkey)
}

/// Derive the Ethereum address of an uncompressed secp256k1 public key.
pub fn address_from_public_key(pubkey: &PublicKey) -> TxResult<Address> {
    let uncompressed = pubkey.serialize_uncompressed();
    let payload = uncompressed.get(1..).ok_or(TxError::SignatureRecovery)?;
    let hash = keccak256(payload);
    let address_bytes = hash.as_slice().get(12..).ok_or(TxError::SignatureRecovery)?;
    Ok(Address::from_slice(address_bytes))
}

/// Derive the Ethereum address of a SEC1-encoded (compressed or not) public key.
pub fn address_from_sec1_bytes(bytes: &[u8]) -> TxResult<Address> {
    let pubkey = PublicKey::from_slice(bytes).map_err(|_| TxError::InvalidPublicKey)?;
    address_from_public_key(&pubkey)
}

fn secp() -> &'static Secp256k1<All> {
    static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey, VerifyingKey};
    use rand::rngs::OsRng;

    fn sign_hash(signing_key: &SigningKey, hash: B256) -> PrimitiveSignature {
        let (sig, recovery_id) = signing_key.sign_prehash(hash.as_ref()).expect("sign");
        let r = U256::from_be_slice(&sig.r().to_bytes());
        let s = U256::from_be_slice(&sig.s().to_bytes());
        PrimitiveSignature::new(r, s, recovery_id.is_y_odd())
    }

    fn get_address(signing_key: &SigningKey) -> Address {
        let verifying_key = VerifyingKey::from(signing_key);
        let public_key = verifying_key.to_encoded_point(false);
        let hash = keccak256(&public_key.as_bytes()[1..]);
        Address::from_slice(&hash[12..])
    }

    #[test]
    fn test_recover_sender_from_valid_signature_hash() {
        let signing_key = SigningKey::random(&mut OsRng);
        let signature_hash = keccak256(b"ante-sender-recovery");
        let signature = sign_hash(&signing_key, signature_hash);

        let recovered = recover_sender_from_signature_hash(signature_hash, &signature).unwrap();

        assert_eq!(recovered, get_address(&signing_key));
    }

    #[test]
    fn test_recover_sender_rejects_invalid_components() {
        let signature_hash = keccak256(b"invalid-components");
        let invalid = PrimitiveSignature::new(U256::MAX, U256::MAX, false);

        let err = recover_sender_from_signature_hash(signature_hash, &invalid).unwrap_err();
        assert_eq!(err, TxError::SignatureRecovery);
    }

    #[test]
    fn test_compressed_and_uncompressed_keys_share_address() {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        let compressed = verifying_key.to_encoded_point(true);
        let uncompressed = verifying_key.to_encoded_point(false);

        let a = address_from_sec1_bytes(compressed.as_bytes()).unwrap();
        let b = address_from_sec1_bytes(uncompressed.as_bytes()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, get_address(&signing_key));
    }

    #[test]
    fn test_garbage_public_key_rejected() {
        let err = address_from_sec1_bytes(&[0x02; 12]).unwrap_err();
        assert_eq!(err, TxError::InvalidPublicKey);
    }
}
