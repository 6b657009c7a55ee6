//! Collaborators and limits of the ante handler.

use std::sync::Arc;

use crate::cosmos::{DynamicFeeChecker, TxFeeChecker, DEFAULT_MAX_NESTED_AUTHZ_DEPTH};
use crate::error::{AnteError, AnteResult};
use crate::keepers::{
    AccountKeeper, BankKeeper, EvmKeeper, ExtensionOptionChecker, FeeMarketKeeper,
    FeegrantKeeper,
};
use crate::signing::{SignModeHandler, SignatureGasConsumer, SignatureVerifier};

/// Everything [`crate::AnteHandler::new`] needs.
///
/// Keepers and signing collaborators are required; the fee grant keeper and
/// the extension option checker are optional and disable their feature
/// when absent. Without a fee checker, native fees are checked by a
/// [`DynamicFeeChecker`] over the EVM and fee market keepers.
///
/// # Example
///
/// ```ignore
/// let handler = AnteHandler::new(
///     HandlerOptions::new()
///         .account_keeper(accounts)
///         .bank_keeper(bank)
///         .evm_keeper(evm)
///         .fee_market_keeper(fee_market)
///         .sign_mode_handler(Arc::new(DefaultSignModeHandler))
///         .signature_verifier(Arc::new(EthSecp256k1Verifier))
///         .sig_gas_consumer(Arc::new(DefaultSigGasConsumer::default()))
///         .max_tx_gas_wanted(40_000_000),
/// )?;
/// ```
#[derive(Clone)]
pub struct HandlerOptions {
    pub account_keeper: Option<Arc<dyn AccountKeeper>>,
    pub bank_keeper: Option<Arc<dyn BankKeeper>>,
    pub evm_keeper: Option<Arc<dyn EvmKeeper>>,
    pub fee_market_keeper: Option<Arc<dyn FeeMarketKeeper>>,
    pub sign_mode_handler: Option<Arc<dyn SignModeHandler>>,
    pub signature_verifier: Option<Arc<dyn SignatureVerifier>>,
    pub sig_gas_consumer: Option<Arc<dyn SignatureGasConsumer>>,
    pub feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    pub extension_option_checker: Option<Arc<dyn ExtensionOptionChecker>>,
    pub tx_fee_checker: Option<Arc<dyn TxFeeChecker>>,
    /// Per-message cap on gas wanted during mempool admission; 0 = uncapped.
    pub max_tx_gas_wanted: u64,
    /// Type URLs that may not be executed or granted through authz.
    pub disabled_authz_msgs: Vec<String>,
    pub max_nested_authz_depth: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self {
            account_keeper: None,
            bank_keeper: None,
            evm_keeper: None,
            fee_market_keeper: None,
            sign_mode_handler: None,
            signature_verifier: None,
            sig_gas_consumer: None,
            feegrant_keeper: None,
            extension_option_checker: None,
            tx_fee_checker: None,
            max_tx_gas_wanted: 0,
            disabled_authz_msgs: Vec::new(),
            max_nested_authz_depth: DEFAULT_MAX_NESTED_AUTHZ_DEPTH,
        }
    }

    pub fn account_keeper(mut self, keeper: Arc<dyn AccountKeeper>) -> Self {
        self.account_keeper = Some(keeper);
        self
    }

    pub fn bank_keeper(mut self, keeper: Arc<dyn BankKeeper>) -> Self {
        self.bank_keeper = Some(keeper);
        self
    }

    pub fn evm_keeper(mut self, keeper: Arc<dyn EvmKeeper>) -> Self {
        self.evm_keeper = Some(keeper);
        self
    }

    pub fn fee_market_keeper(mut self, keeper: Arc<dyn FeeMarketKeeper>) -> Self {
        self.fee_market_keeper = Some(keeper);
        self
    }

    pub fn sign_mode_handler(mut self, handler: Arc<dyn SignModeHandler>) -> Self {
        self.sign_mode_handler = Some(handler);
        self
    }

    pub fn signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signature_verifier = Some(verifier);
        self
    }

    pub fn sig_gas_consumer(mut self, consumer: Arc<dyn SignatureGasConsumer>) -> Self {
        self.sig_gas_consumer = Some(consumer);
        self
    }

    pub fn feegrant_keeper(mut self, keeper: Arc<dyn FeegrantKeeper>) -> Self {
        self.feegrant_keeper = Some(keeper);
        self
    }

    pub fn extension_option_checker(mut self, checker: Arc<dyn ExtensionOptionChecker>) -> Self {
        self.extension_option_checker = Some(checker);
        self
    }

    pub fn tx_fee_checker(mut self, checker: Arc<dyn TxFeeChecker>) -> Self {
        self.tx_fee_checker = Some(checker);
        self
    }

    pub fn max_tx_gas_wanted(mut self, gas: u64) -> Self {
        self.max_tx_gas_wanted = gas;
        self
    }

    pub fn disabled_authz_msgs<I, S>(mut self, type_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_authz_msgs = type_urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_nested_authz_depth(mut self, depth: usize) -> Self {
        self.max_nested_authz_depth = depth;
        self
    }

    /// Fails on the first missing required collaborator.
    pub fn validate(&self) -> AnteResult<()> {
        self.clone().into_validated().map(|_| ())
    }

    pub(crate) fn into_validated(self) -> AnteResult<ValidatedOptions> {
        let account_keeper = required(self.account_keeper, "account keeper")?;
        let bank_keeper = required(self.bank_keeper, "bank keeper")?;
        let evm_keeper = required(self.evm_keeper, "evm keeper")?;
        let fee_market_keeper = required(self.fee_market_keeper, "fee market keeper")?;
        let tx_fee_checker: Arc<dyn TxFeeChecker> = match self.tx_fee_checker {
            Some(checker) => checker,
            None => Arc::new(DynamicFeeChecker::new(
                evm_keeper.clone(),
                fee_market_keeper.clone(),
            )),
        };
        Ok(ValidatedOptions {
            account_keeper,
            bank_keeper,
            evm_keeper,
            fee_market_keeper,
            sign_mode_handler: required(self.sign_mode_handler, "sign mode handler")?,
            signature_verifier: required(self.signature_verifier, "signature verifier")?,
            sig_gas_consumer: required(self.sig_gas_consumer, "signature gas consumer")?,
            feegrant_keeper: self.feegrant_keeper,
            extension_option_checker: self.extension_option_checker,
            tx_fee_checker,
            max_tx_gas_wanted: self.max_tx_gas_wanted,
            disabled_authz_msgs: self.disabled_authz_msgs,
            max_nested_authz_depth: self.max_nested_authz_depth,
        })
    }
}

fn required<T: ?Sized>(value: Option<Arc<T>>, name: &str) -> AnteResult<Arc<T>> {
    value.ok_or_else(|| AnteError::config(format!("{name} is required for AnteHandler")))
}

/// [`HandlerOptions`] with every required collaborator present.
pub(crate) struct ValidatedOptions {
    pub account_keeper: Arc<dyn AccountKeeper>,
    pub bank_keeper: Arc<dyn BankKeeper>,
    pub evm_keeper: Arc<dyn EvmKeeper>,
    pub fee_market_keeper: Arc<dyn FeeMarketKeeper>,
    pub sign_mode_handler: Arc<dyn SignModeHandler>,
    pub signature_verifier: Arc<dyn SignatureVerifier>,
    pub sig_gas_consumer: Arc<dyn SignatureGasConsumer>,
    pub feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    pub extension_option_checker: Option<Arc<dyn ExtensionOptionChecker>>,
    pub tx_fee_checker: Arc<dyn TxFeeChecker>,
    pub max_tx_gas_wanted: u64,
    pub disabled_authz_msgs: Vec<String>,
    pub max_nested_authz_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::AnteFixture;

    #[test]
    fn test_complete_options_validate() {
        let options = AnteFixture::new().handler_options();
        assert!(options.validate().is_ok());
        assert_eq!(options.max_nested_authz_depth, DEFAULT_MAX_NESTED_AUTHZ_DEPTH);
    }

    #[test]
    fn test_missing_collaborator_is_named() {
        let cases: Vec<(&str, fn(HandlerOptions) -> HandlerOptions)> = vec![
            ("account keeper", |mut o| {
                o.account_keeper = None;
                o
            }),
            ("bank keeper", |mut o| {
                o.bank_keeper = None;
                o
            }),
            ("evm keeper", |mut o| {
                o.evm_keeper = None;
                o
            }),
            ("fee market keeper", |mut o| {
                o.fee_market_keeper = None;
                o
            }),
            ("sign mode handler", |mut o| {
                o.sign_mode_handler = None;
                o
            }),
            ("signature verifier", |mut o| {
                o.signature_verifier = None;
                o
            }),
            ("signature gas consumer", |mut o| {
                o.sig_gas_consumer = None;
                o
            }),
        ];

        for (name, strip) in cases {
            let err = strip(AnteFixture::new().handler_options())
                .validate()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config);
            assert_eq!(err.detail(), format!("{name} is required for AnteHandler"));
        }
    }

    #[test]
    fn test_optional_collaborators() {
        let mut options = AnteFixture::new().handler_options();
        options.feegrant_keeper = None;
        options.extension_option_checker = None;
        options.tx_fee_checker = None;
        assert!(options.validate().is_ok());
    }
}
