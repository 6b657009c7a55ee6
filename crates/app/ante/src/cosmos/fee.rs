//! Fee checks and deduction for native transactions.

use std::sync::Arc;

use alloy_primitives::U256;
use tracing::debug;

use crate::chain::AnteDecorator;
use crate::coins::{Coin, Coins};
use crate::context::{AnteContext, Event};
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::evm::gas::{ATTRIBUTE_KEY_FEE, ATTRIBUTE_KEY_FEE_PAYER, EVENT_TYPE_TX};
use crate::keepers::{AccountKeeper, BankKeeper, FeegrantKeeper};
use crate::tx::Tx;

/// Check the fee against the node's own minimum gas prices and return the
/// transaction priority.
///
/// The local minimum only applies on mempool admission. The fee must cover
/// the required amount in at least one of the configured denoms.
pub fn check_tx_fee_with_validator_min_gas_prices(ctx: &AnteContext, tx: &Tx) -> AnteResult<u64> {
    let fee = &tx.fee.amount;
    let gas = tx.gas();

    if ctx.is_check_tx() && !ctx.min_gas_prices().is_zero() {
        let gas_dec = U256::from(gas);
        let mut required = Vec::new();
        for price in ctx.min_gas_prices().iter() {
            let amount = price
                .amount
                .checked_mul_int(gas_dec)
                .ok_or_else(|| AnteError::invalid_coins("required fee overflow"))?
                .ceil();
            required.push(Coin::new(price.denom.clone(), amount));
        }
        let required = Coins::new(required)
            .ok_or_else(|| AnteError::invalid_coins("required fee overflow"))?;
        if !fee.is_any_gte(&required) {
            return Err(AnteError::insufficient_fee(format!(
                "insufficient fees; got: {fee} required: {required}"
            )));
        }
    }

    Ok(tx_priority(fee, gas))
}

/// Validates the fee of a native transaction, returning the fee to deduct
/// and the transaction priority.
pub trait TxFeeChecker: Send + Sync {
    fn check_tx_fee(&self, ctx: &AnteContext, tx: &Tx) -> AnteResult<(Coins, u64)>;
}

/// Charges the declared fee after checking it against the node's own
/// minimum gas prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorMinGasPriceChecker;

impl TxFeeChecker for ValidatorMinGasPriceChecker {
    fn check_tx_fee(&self, ctx: &AnteContext, tx: &Tx) -> AnteResult<(Coins, u64)> {
        let priority = check_tx_fee_with_validator_min_gas_prices(ctx, tx)?;
        Ok((tx.fee.amount.clone(), priority))
    }
}

/// Smallest per-denom gas price paid, saturating at `i64::MAX`.
fn tx_priority(fee: &Coins, gas: u64) -> u64 {
    if gas == 0 {
        return 0;
    }
    let cap = U256::from(i64::MAX as u64);
    fee.iter()
        .map(|coin| (coin.amount / U256::from(gas)).min(cap))
        .min()
        .map(|price| price.saturating_to::<u64>())
        .unwrap_or(0)
}

/// Deducts the fee from the payer, or from the granter when a fee grant
/// covers it, and sets the transaction priority.
///
/// The fee and priority come from a [`TxFeeChecker`], by default
/// [`ValidatorMinGasPriceChecker`]. Simulation skips the checker and
/// deducts the declared fee.
pub struct DeductFeeDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    bank_keeper: Arc<dyn BankKeeper>,
    feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    fee_checker: Arc<dyn TxFeeChecker>,
}

impl DeductFeeDecorator {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        bank_keeper: Arc<dyn BankKeeper>,
        feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    ) -> Self {
        Self {
            account_keeper,
            bank_keeper,
            feegrant_keeper,
            fee_checker: Arc::new(ValidatorMinGasPriceChecker),
        }
    }

    pub fn with_tx_fee_checker(mut self, checker: Arc<dyn TxFeeChecker>) -> Self {
        self.fee_checker = checker;
        self
    }

    fn deduct(&self, ctx: &mut AnteContext, tx: &Tx, fee: &Coins) -> AnteResult<()> {
        let payer = tx
            .fee_payer()
            .ok_or_else(|| AnteError::unknown_address("transaction has no fee payer"))?;
        if self.account_keeper.get_account(payer).is_none() {
            return Err(AnteError::unknown_address(format!(
                "fee payer address: {payer} does not exist"
            )));
        }

        let mut deduct_from = payer;
        if let Some(granter) = tx.fee.granter.filter(|granter| *granter != payer) {
            let Some(feegrant) = &self.feegrant_keeper else {
                return Err(AnteError::invalid_request("fee grants are not enabled"));
            };
            feegrant
                .use_granted_fees(granter, payer, fee, &tx.msgs)
                .map_err(|err| {
                    err.wrap(format!("{granter} does not allow to pay fees for {payer}"))
                })?;
            deduct_from = granter;
        }

        if self.account_keeper.get_account(deduct_from).is_none() {
            return Err(AnteError::unknown_address(format!(
                "fee payer address: {deduct_from} does not exist"
            )));
        }

        if !fee.is_zero() {
            self.bank_keeper
                .deduct_fees(deduct_from, fee)
                .map_err(|err| err.wrap("failed to deduct fees"))?;
        }

        ctx.events.emit(
            Event::new(EVENT_TYPE_TX)
                .with_attribute(ATTRIBUTE_KEY_FEE, fee.to_string())
                .with_attribute(ATTRIBUTE_KEY_FEE_PAYER, deduct_from.to_string()),
        );
        debug!(payer = %deduct_from, %fee, "deducted fees");
        Ok(())
    }
}

impl AnteDecorator for DeductFeeDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        if !simulate && ctx.block_height() > 0 && tx.gas() == 0 {
            return Err(AnteError::new(
                ErrorKind::InvalidGasLimit,
                "must provide positive gas",
            ));
        }

        let (fee, priority) = if simulate {
            (tx.fee.amount.clone(), 0)
        } else {
            self.fee_checker.check_tx_fee(ctx, tx)?
        };

        self.deduct(ctx, tx, &fee)?;
        ctx.set_priority(priority);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "DeductFeeDecorator"
    }
}
