//! Routing of transactions to the Ethereum or the native decorator chain.

use tracing::debug;

use crate::chain::{AnteChain, AnteDecorator};
use crate::context::AnteContext;
use crate::cosmos::{
    AuthzLimiterDecorator, DeductFeeDecorator, ExtensionOptionsDecorator,
    IncrementSequenceDecorator, MinGasPriceDecorator, RejectMessagesDecorator,
    SetPubKeyDecorator, SetUpContextDecorator, SigGasConsumeDecorator, SigVerificationDecorator,
    TxTimeoutHeightDecorator, ValidateBasicDecorator, ValidateMemoDecorator,
    ValidateSigCountDecorator,
};
use crate::error::AnteResult;
use crate::evm::{EthEnvelopeDecorator, EvmMonoDecorator, GasWantedDecorator};
use crate::options::HandlerOptions;
use crate::tx::Tx;

/// Entry point of transaction admission.
///
/// A transaction whose first extension option is the Ethereum marker goes
/// through the Ethereum chain; every other transaction goes through the
/// native chain, which rejects unknown extension options.
pub struct AnteHandler {
    evm: AnteChain,
    native: AnteChain,
}

impl AnteHandler {
    /// Validate `options` and build both chains.
    pub fn new(options: HandlerOptions) -> AnteResult<Self> {
        let options = options.into_validated()?;

        let evm = AnteChain::default()
            .with(EthEnvelopeDecorator::new(options.evm_keeper.clone()))
            .with(EvmMonoDecorator::new(
                options.account_keeper.clone(),
                options.evm_keeper.clone(),
                options.fee_market_keeper.clone(),
                options.max_tx_gas_wanted,
            ));

        let native = AnteChain::default()
            .with(RejectMessagesDecorator)
            .with(
                AuthzLimiterDecorator::new(options.disabled_authz_msgs.iter().cloned())
                    .with_max_nested_depth(options.max_nested_authz_depth),
            )
            .with(SetUpContextDecorator)
            .with(ExtensionOptionsDecorator::new(
                options.extension_option_checker.clone(),
            ))
            .with(ValidateBasicDecorator)
            .with(TxTimeoutHeightDecorator)
            .with(ValidateMemoDecorator::default())
            .with(MinGasPriceDecorator::new(
                options.fee_market_keeper.clone(),
                options.evm_keeper.clone(),
            ))
            .with(
                DeductFeeDecorator::new(
                    options.account_keeper.clone(),
                    options.bank_keeper.clone(),
                    options.feegrant_keeper.clone(),
                )
                .with_tx_fee_checker(options.tx_fee_checker.clone()),
            )
            .with(SetPubKeyDecorator::new(options.account_keeper.clone()))
            .with(ValidateSigCountDecorator::default())
            .with(SigGasConsumeDecorator::new(
                options.account_keeper.clone(),
                options.sig_gas_consumer.clone(),
            ))
            .with(SigVerificationDecorator::new(
                options.account_keeper.clone(),
                options.sign_mode_handler.clone(),
                options.signature_verifier.clone(),
            ))
            .with(IncrementSequenceDecorator::new(options.account_keeper.clone()))
            .with(GasWantedDecorator::new(
                options.evm_keeper,
                options.fee_market_keeper,
                options.max_tx_gas_wanted,
            ));

        Ok(Self { evm, native })
    }

    pub fn evm_chain(&self) -> &AnteChain {
        &self.evm
    }

    pub fn native_chain(&self) -> &AnteChain {
        &self.native
    }

    fn route(&self, tx: &Tx) -> &AnteChain {
        if tx.is_ethereum() {
            &self.evm
        } else {
            &self.native
        }
    }

    /// Admit `tx`; the terminal handler is a no-op.
    pub fn handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        self.handle_with(ctx, tx, simulate, |_, _, _| Ok(()))
    }

    /// Admit `tx`, then run `next` on the updated context.
    pub fn handle_with<F>(
        &self,
        ctx: &mut AnteContext,
        tx: &Tx,
        simulate: bool,
        next: F,
    ) -> AnteResult<()>
    where
        F: FnOnce(&mut AnteContext, &Tx, bool) -> AnteResult<()>,
    {
        let chain = self.route(tx);
        debug!(
            ethereum = tx.is_ethereum(),
            msgs = tx.msgs.len(),
            simulate,
            "running ante handler"
        );
        chain.run_with(ctx, tx, simulate, next)
    }
}

impl AnteDecorator for AnteHandler {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        self.handle(ctx, tx, simulate)
    }

    fn name(&self) -> &'static str {
        "AnteHandler"
    }
}
