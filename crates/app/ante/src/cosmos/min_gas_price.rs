//! Chain-wide minimum gas price for native transactions.

use std::sync::Arc;

use alloy_primitives::U256;

use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::keepers::{EvmKeeper, FeeMarketKeeper};
use crate::tx::Tx;

/// Enforces the fee market's `min_gas_price` on native transactions. The
/// fee must be paid in the EVM denom.
pub struct MinGasPriceDecorator {
    fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    evm_keeper: Arc<dyn EvmKeeper>,
}

impl MinGasPriceDecorator {
    pub fn new(fee_market_keeper: Arc<dyn FeeMarketKeeper>, evm_keeper: Arc<dyn EvmKeeper>) -> Self {
        Self {
            fee_market_keeper,
            evm_keeper,
        }
    }
}

impl AnteDecorator for MinGasPriceDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        let min_gas_price = self.fee_market_keeper.params().min_gas_price;
        if min_gas_price.is_zero() || simulate {
            return Ok(());
        }

        let denom = self.evm_keeper.params().coin_info.denom;
        let fee = &tx.fee.amount;
        let only_native = fee.is_empty() || (fee.len() == 1 && !fee.amount_of(&denom).is_zero());
        if !only_native {
            return Err(AnteError::invalid_coins(format!(
                "expected only native token {denom} for fee"
            )));
        }

        let required = min_gas_price
            .checked_mul_int(U256::from(tx.gas()))
            .ok_or_else(|| AnteError::invalid_coins("required fee overflow"))?
            .ceil();
        let paid = fee.amount_of(&denom);
        if paid < required {
            return Err(AnteError::insufficient_fee(format!(
                "provided fee < minimum global fee ({paid}{denom} < {required}{denom}). Please increase the gas price."
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MinGasPriceDecorator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::{Coin, Coins};
    use crate::context::ExecMode;
    use crate::error::ErrorKind;
    use crate::feemarket::FeeMarketParams;
    use crate::testing::AnteFixture;

    fn fixture_with_min(min: &str) -> AnteFixture {
        let fixture = AnteFixture::new();
        fixture.fee_market.set_params(FeeMarketParams {
            min_gas_price: min.parse().unwrap(),
            ..FeeMarketParams::default()
        });
        fixture
    }

    fn decorator(fixture: &AnteFixture) -> MinGasPriceDecorator {
        MinGasPriceDecorator::new(fixture.fee_market.clone(), fixture.evm.clone())
    }

    fn tx_paying(amount: Coins, gas: u64) -> Tx {
        let mut tx = Tx::default();
        tx.fee.amount = amount;
        tx.fee.gas_limit = gas;
        tx
    }

    #[test]
    fn test_fee_below_minimum() {
        let fixture = fixture_with_min("0.5");
        let mut ctx = fixture.context(ExecMode::CheckTx);
        let tx = tx_paying(Coins::single("aevm", U256::from(49u64)), 100);

        let err = decorator(&fixture)
            .ante_handle(&mut ctx, &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFee);
        assert!(err.detail().contains("(49aevm < 50aevm)"));

        let tx = tx_paying(Coins::single("aevm", U256::from(50u64)), 100);
        assert!(decorator(&fixture).ante_handle(&mut ctx, &tx, false).is_ok());
    }

    #[test]
    fn test_required_fee_rounds_up() {
        let fixture = fixture_with_min("0.5");
        let mut ctx = fixture.context(ExecMode::CheckTx);
        let tx = tx_paying(Coins::single("aevm", U256::from(50u64)), 101);
        assert!(decorator(&fixture).ante_handle(&mut ctx, &tx, false).is_err());
    }

    #[test]
    fn test_foreign_denom_rejected() {
        let fixture = fixture_with_min("1");
        let mut ctx = fixture.context(ExecMode::CheckTx);
        let fee = Coins::new(vec![
            Coin::new("aevm", U256::from(100u64)),
            Coin::new("stake", U256::from(1u64)),
        ])
        .unwrap();

        let err = decorator(&fixture)
            .ante_handle(&mut ctx, &tx_paying(fee, 100), false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCoins);
        assert_eq!(err.detail(), "expected only native token aevm for fee");
    }

    #[test]
    fn test_skipped_when_zero_or_simulating() {
        let fixture = AnteFixture::new();
        let mut ctx = fixture.context(ExecMode::CheckTx);
        let tx = tx_paying(Coins::default(), 100);
        assert!(decorator(&fixture).ante_handle(&mut ctx, &tx, false).is_ok());

        let fixture = fixture_with_min("1");
        assert!(decorator(&fixture).ante_handle(&mut ctx, &tx, true).is_ok());
        assert!(decorator(&fixture).ante_handle(&mut ctx, &tx, false).is_err());
    }
}
