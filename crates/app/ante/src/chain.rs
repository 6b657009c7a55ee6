//! Ordered decorator chains.

use tracing::debug;

use crate::context::AnteContext;
use crate::error::AnteResult;
use crate::tx::Tx;

/// One admission step.
///
/// Steps run in order; the first error ends admission of the transaction.
/// A step may update the context (gas meter, priority, events, block
/// state) for the steps after it.
pub trait AnteDecorator: Send + Sync {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Decorators run by a driver loop.
#[derive(Default)]
pub struct AnteChain {
    decorators: Vec<Box<dyn AnteDecorator>>,
}

impl AnteChain {
    pub fn new(decorators: Vec<Box<dyn AnteDecorator>>) -> Self {
        Self { decorators }
    }

    pub fn with(mut self, decorator: impl AnteDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Names of the decorators, in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.decorators.iter().map(|d| d.name()).collect()
    }

    /// Run every decorator, then `next` if all of them accepted.
    pub fn run_with<F>(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool, next: F) -> AnteResult<()>
    where
        F: FnOnce(&mut AnteContext, &Tx, bool) -> AnteResult<()>,
    {
        self.ante_handle(ctx, tx, simulate)?;
        next(ctx, tx, simulate)
    }
}

impl AnteDecorator for AnteChain {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        for decorator in &self.decorators {
            if let Err(err) = decorator.ante_handle(ctx, tx, simulate) {
                debug!(decorator = decorator.name(), error = %err, "ante decorator rejected tx");
                return Err(err);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AnteChain"
    }
}
