//! Intrinsic gas of an Ethereum message.

use alloy_eips::eip2930::AccessList;

use crate::error::{TxError, TxResult};

/// Base cost of a message call.
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract creation (Homestead).
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Cost per zero byte of input.
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Cost per non-zero byte of input (EIP-2028).
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;
/// Cost per address in the access list (EIP-2930).
pub const TX_ACCESS_LIST_ADDRESS_GAS: u64 = 2_400;
/// Cost per storage key in the access list (EIP-2930).
pub const TX_ACCESS_LIST_STORAGE_KEY_GAS: u64 = 1_900;
/// Cost per 32-byte word of init code (EIP-3860).
pub const INIT_CODE_WORD_GAS: u64 = 2;

/// Minimum gas a message consumes before any EVM execution.
pub fn intrinsic_gas(
    input: &[u8],
    access_list: Option<&AccessList>,
    is_contract_creation: bool,
    is_shanghai: bool,
) -> TxResult<u64> {
    let mut gas = if is_contract_creation {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };

    let non_zero = input.iter().filter(|b| **b != 0).count() as u64;
    let zero = input.len() as u64 - non_zero;

    gas = non_zero
        .checked_mul(TX_DATA_NON_ZERO_GAS)
        .and_then(|g| g.checked_add(gas))
        .ok_or(TxError::IntrinsicGasOverflow)?;
    gas = zero
        .checked_mul(TX_DATA_ZERO_GAS)
        .and_then(|g| g.checked_add(gas))
        .ok_or(TxError::IntrinsicGasOverflow)?;

    if is_contract_creation && is_shanghai {
        let words = (input.len() as u64).div_ceil(32);
        gas = words
            .checked_mul(INIT_CODE_WORD_GAS)
            .and_then(|g| g.checked_add(gas))
            .ok_or(TxError::IntrinsicGasOverflow)?;
    }

    if let Some(access_list) = access_list {
        let addresses = access_list.0.len() as u64;
        let keys = access_list
            .0
            .iter()
            .map(|item| item.storage_keys.len() as u64)
            .sum::<u64>();
        gas = addresses
            .checked_mul(TX_ACCESS_LIST_ADDRESS_GAS)
            .and_then(|g| g.checked_add(gas))
            .and_then(|g| keys.checked_mul(TX_ACCESS_LIST_STORAGE_KEY_GAS)?.checked_add(g))
            .ok_or(TxError::IntrinsicGasOverflow)?;
    }

    Ok(gas)
}
