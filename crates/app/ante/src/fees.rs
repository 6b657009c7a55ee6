//! Minimum fee policies.
//!
//! The global check enforces the chain-wide floor from the fee market; the
//! mempool check is the local node's policy and only applies before London.
//! Both compare a total fee against `min_gas_price * gas_limit`.

use crate::error::{AnteError, AnteResult};
use crate::math::Dec;

fn required_fee(min_gas_price: Dec, gas_limit: Dec) -> AnteResult<Dec> {
    min_gas_price
        .checked_mul(gas_limit)
        .ok_or_else(|| AnteError::invalid_coins(format!("required fee overflow: {min_gas_price} * {gas_limit}")))
}

/// Local minimum gas price check; a no-op once London is active.
pub fn check_mempool_fee(
    fee: Dec,
    mempool_min_gas_price: Dec,
    gas_limit: Dec,
    is_london: bool,
) -> AnteResult<()> {
    if is_london {
        return Ok(());
    }
    let required = required_fee(mempool_min_gas_price, gas_limit)?;
    if fee < required {
        return Err(AnteError::insufficient_fee(format!(
            "insufficient fee; got: {fee} required: {required}"
        )));
    }
    Ok(())
}

/// Chain-wide minimum gas price check; a no-op while the minimum is zero.
pub fn check_global_fee(fee: Dec, global_min_gas_price: Dec, gas_limit: Dec) -> AnteResult<()> {
    if global_min_gas_price.is_zero() {
        return Ok(());
    }
    let required = required_fee(global_min_gas_price, gas_limit)?;
    if fee < required {
        return Err(AnteError::insufficient_fee(format!(
            "provided fee < minimum global fee ({fee} < {required}). Please increase the priority tip (for EIP-1559 txs) or the gas prices (for access list or legacy txs)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dec(v: u64) -> Dec {
        Dec::from_u64(v)
    }

    #[test]
    fn test_mempool_fee_before_london() {
        let err = check_mempool_fee(dec(99), dec(1), dec(100), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFee);
        assert!(err.detail().starts_with("insufficient fee; got: 99.0"));

        assert!(check_mempool_fee(dec(100), dec(1), dec(100), false).is_ok());
        assert!(check_mempool_fee(dec(0), dec(1), dec(100), true).is_ok());
    }

    #[test]
    fn test_global_fee() {
        assert!(check_global_fee(dec(0), Dec::ZERO, dec(100)).is_ok());

        let err = check_global_fee(dec(10), dec(1), dec(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFee);
        assert!(err.detail().contains("minimum global fee"));
        assert!(check_global_fee(dec(100), dec(1), dec(100)).is_ok());
    }

    #[test]
    fn test_fractional_min_gas_price() {
        let half: Dec = "0.5".parse().unwrap();
        assert!(check_global_fee(dec(50), half, dec(100)).is_ok());
        assert!(check_global_fee(dec(49), half, dec(100)).is_err());
    }
}
