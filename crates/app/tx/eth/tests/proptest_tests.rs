//! Property-based tests for fee math and sender recovery.

use alloy_consensus::{SignableTransaction, TxEip1559, TxLegacy};
use alloy_eips::eip2930::AccessList;
use alloy_primitives::{Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use evolve_tx_eth::{ChainIdPolicy, MsgEthereumTx, TxData};
use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey, VerifyingKey};
use proptest::prelude::*;
use rand::rngs::OsRng;

fn sign_hash(signing_key: &SigningKey, hash: B256) -> PrimitiveSignature {
    let Ok((sig, recovery_id)) = signing_key.sign_prehash(hash.as_ref()) else {
        panic!("signing a 32-byte prehash failed");
    };
    let r = U256::from_be_slice(&sig.r().to_bytes());
    let s = U256::from_be_slice(&sig.s().to_bytes());
    PrimitiveSignature::new(r, s, recovery_id.is_y_odd())
}

fn get_address(signing_key: &SigningKey) -> Address {
    let verifying_key = VerifyingKey::from(signing_key);
    let public_key = verifying_key.to_encoded_point(false);
    let hash = alloy_primitives::keccak256(&public_key.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

// ============================================================================
// Strategies
// ============================================================================

fn arb_address() -> impl Strategy<Value = Address> {
    prop::array::uniform20(any::<u8>()).prop_map(Address::from)
}

fn arb_legacy_tx() -> impl Strategy<Value = TxLegacy> {
    (
        any::<u64>(),
        1u128..1_000_000_000_000,
        21_000u64..30_000_000,
        arb_address(),
        any::<u64>(),
    )
        .prop_map(|(nonce, gas_price, gas_limit, to, value)| TxLegacy {
            chain_id: Some(9000),
            nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: U256::from(value),
            input: Bytes::new(),
        })
}

fn arb_eip1559_tx() -> impl Strategy<Value = TxEip1559> {
    (
        any::<u64>(),
        21_000u64..30_000_000,
        1u128..1_000_000_000_000,
        0u128..1_000_000_000_000,
        any::<u64>(),
    )
        .prop_map(|(nonce, gas_limit, fee_cap, tip, value)| TxEip1559 {
            chain_id: 9000,
            nonce,
            gas_limit,
            max_fee_per_gas: fee_cap,
            max_priority_fee_per_gas: tip.min(fee_cap),
            to: TxKind::Call(Address::repeat_byte(3)),
            value: U256::from(value),
            access_list: AccessList::default(),
            input: Bytes::new(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_sender_matches_signer(tx in arb_eip1559_tx()) {
        let key = SigningKey::random(&mut OsRng);
        let signature = sign_hash(&key, tx.signature_hash());
        let msg = MsgEthereumTx::from_signed(tx.into_signed(signature).into()).unwrap();

        prop_assert_eq!(msg.from(), get_address(&key));
        prop_assert!(msg.verify_sender(&ChainIdPolicy::strict(9000)).is_ok());
        prop_assert!(msg.validate_basic().is_ok());
    }

    #[test]
    fn prop_legacy_roundtrip_preserves_sender(tx in arb_legacy_tx()) {
        let key = SigningKey::random(&mut OsRng);
        let signature = sign_hash(&key, tx.signature_hash());
        let data: TxData = tx.into_signed(signature).into();

        let decoded = MsgEthereumTx::decode(&data.encode()).unwrap();
        prop_assert_eq!(decoded.from(), get_address(&key));
        prop_assert_eq!(decoded.data(), &data);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_effective_price_bounded_by_fee_cap(tx in arb_eip1559_tx(), base_fee in 0u64..2_000_000_000_000) {
        let sig = PrimitiveSignature::new(U256::from(1u64), U256::from(1u64), false);
        let data: TxData = tx.into_signed(sig).into();
        let base_fee = Some(U256::from(base_fee));

        let price = data.effective_gas_price(base_fee);
        prop_assert!(price <= data.gas_fee_cap());
        prop_assert!(data.effective_fee(base_fee).unwrap() <= data.fee().unwrap());
        prop_assert!(data.effective_cost(base_fee).unwrap() <= data.cost().unwrap());
        prop_assert!(data.effective_tip(base_fee) <= data.gas_tip_cap());
    }

    #[test]
    fn prop_cost_is_fee_plus_value(tx in arb_legacy_tx()) {
        let sig = PrimitiveSignature::new(U256::from(1u64), U256::from(1u64), false);
        let data: TxData = tx.into_signed(sig).into();

        prop_assert_eq!(data.cost().unwrap(), data.fee().unwrap() + data.value());
        prop_assert_eq!(
            data.fee().unwrap(),
            U256::from(data.gas_limit()) * data.gas_price()
        );
    }
}
