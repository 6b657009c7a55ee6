//! Gas meter setup and extension options of native transactions.

use std::sync::Arc;

use crate::chain::AnteDecorator;
use crate::context::{AnteContext, GasMeter};
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::keepers::ExtensionOptionChecker;
use crate::tx::Tx;

/// Meters the rest of admission against the fee's gas limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetUpContextDecorator;

impl AnteDecorator for SetUpContextDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        ctx.gas_meter = GasMeter::finite(tx.gas());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SetUpContextDecorator"
    }
}

/// Rejects extension options the checker does not accept; without a
/// checker every option is rejected.
#[derive(Clone, Default)]
pub struct ExtensionOptionsDecorator {
    checker: Option<Arc<dyn ExtensionOptionChecker>>,
}

impl ExtensionOptionsDecorator {
    pub fn new(checker: Option<Arc<dyn ExtensionOptionChecker>>) -> Self {
        Self { checker }
    }
}

impl AnteDecorator for ExtensionOptionsDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        for option in &tx.extension_options {
            let accepted = self
                .checker
                .as_ref()
                .is_some_and(|checker| checker.accepts(&option.type_url, &option.value));
            if !accepted {
                return Err(AnteError::new(
                    ErrorKind::UnknownExtensionOptions,
                    format!("rejecting tx with unsupported extension option: {}", option.type_url),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ExtensionOptionsDecorator"
    }
}
