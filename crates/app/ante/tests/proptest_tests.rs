//! Property tests over the admission arithmetic and bookkeeping.

use alloy_primitives::{Address, U256};
use evolve_ante::cosmos::AuthzLimiterDecorator;
use evolve_ante::evm::increment_nonce;
use evolve_ante::memory::MemoryAccountKeeper;
use evolve_ante::{
    calculate_base_fee, check_global_fee, check_mempool_fee, AccountKeeper, Dec, ErrorKind,
    EvmCoinInfo, FeeMarketParams, Msg,
};
use proptest::prelude::*;

fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from)
}

fn arb_coin_info() -> impl Strategy<Value = EvmCoinInfo> {
    (1u8..=18).prop_map(|decimals| {
        if decimals == 18 {
            EvmCoinInfo::eighteen_decimals("aevm")
        } else {
            EvmCoinInfo::new("uevm", "aevm", decimals)
        }
    })
}

fn nested_exec(depth: usize) -> Msg {
    (0..depth).fold(
        Msg::plain("/cosmos.bank.v1beta1.MsgSend", Address::repeat_byte(1)),
        |msg, _| Msg::GrantExec {
            grantee: Address::repeat_byte(2),
            msgs: vec![msg],
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_nonce_increments_only_on_match(
        address in arb_address(),
        sequence in 0u64..u64::MAX,
        nonce in any::<u64>(),
    ) {
        let keeper = MemoryAccountKeeper::new();
        let mut account = keeper.new_account_with_address(address);
        account.sequence = sequence;
        keeper.set_account(account.clone());

        let result = increment_nonce(&keeper, account, nonce);

        if nonce == sequence {
            prop_assert!(result.is_ok());
            prop_assert_eq!(keeper.get_sequence(address).unwrap(), sequence + 1);
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidSequence);
            prop_assert_eq!(keeper.get_sequence(address).unwrap(), sequence);
        }
    }

    #[test]
    fn prop_global_fee_threshold(
        fee in 0u64..u64::from(u32::MAX),
        min_gas_price in 0u64..1_000,
        gas in 0u64..1_000_000,
    ) {
        let result = check_global_fee(
            Dec::from_u64(fee),
            Dec::from_u64(min_gas_price),
            Dec::from_u64(gas),
        );
        let required = min_gas_price * gas;
        if min_gas_price == 0 || fee >= required {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InsufficientFee);
        }
    }

    #[test]
    fn prop_mempool_fee_ignored_after_london(
        fee in any::<u32>(),
        min_gas_price in any::<u32>(),
        gas in any::<u32>(),
    ) {
        let fee = Dec::from_u64(fee.into());
        let price = Dec::from_u64(min_gas_price.into());
        let gas_dec = Dec::from_u64(gas.into());

        prop_assert!(check_mempool_fee(fee, price, gas_dec, true).is_ok());

        let before_london = check_mempool_fee(fee, price, gas_dec, false);
        let required = u64::from(min_gas_price) * u64::from(gas);
        prop_assert_eq!(before_london.is_ok(), fee >= Dec::from_u64(required));
    }

    #[test]
    fn prop_bank_amount_survives_evm_view(
        coin_info in arb_coin_info(),
        amount in any::<u128>(),
    ) {
        let amount = U256::from(amount);
        let evm = coin_info.to_evm(amount);
        prop_assert_eq!(coin_info.from_evm(evm), amount);
        prop_assert_eq!(coin_info.from_evm_ceil(evm), amount);
    }

    #[test]
    fn prop_ceil_charge_never_under_collects(
        coin_info in arb_coin_info(),
        evm_amount in any::<u128>(),
    ) {
        let evm_amount = U256::from(evm_amount);
        let factor = coin_info.conversion_factor();
        let charged = coin_info.to_evm(coin_info.from_evm_ceil(evm_amount));
        prop_assert!(charged >= evm_amount);
        prop_assert!(charged < evm_amount + factor);
        prop_assert!(coin_info.from_evm(evm_amount) <= coin_info.from_evm_ceil(evm_amount));
    }

    #[test]
    fn prop_authz_depth_limit(depth in 0usize..10, max_depth in 1usize..8) {
        let limiter = AuthzLimiterDecorator::new(["/cosmos.staking.v1beta1.MsgDelegate"])
            .with_max_nested_depth(max_depth);
        let result = limiter.check_disabled_msgs(&[nested_exec(depth)], 0);
        if depth <= max_depth {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::Unauthorized);
        }
    }

    #[test]
    fn prop_base_fee_moves_with_demand(
        parent in 1u64..1_000_000_000_000,
        gas_wanted in 0u64..30_000_000,
        min_gas_price in 0u64..1_000,
    ) {
        let params = FeeMarketParams {
            min_gas_price: Dec::from_u64(min_gas_price),
            ..FeeMarketParams::default()
        };
        let parent_fee = Dec::from_u64(parent);
        let gas_limit = 30_000_000u64;
        let target = gas_limit / u64::from(params.elasticity_multiplier);

        let next = calculate_base_fee(&params, 10, parent_fee, gas_wanted, Some(gas_limit)).unwrap();

        match gas_wanted.cmp(&target) {
            std::cmp::Ordering::Greater => prop_assert!(next > parent_fee),
            std::cmp::Ordering::Equal => prop_assert_eq!(next, parent_fee),
            std::cmp::Ordering::Less => {
                prop_assert!(next <= parent_fee.max(params.min_gas_price));
                prop_assert!(next >= params.min_gas_price);
            }
        }
    }
}
