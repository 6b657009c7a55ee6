//! Blocks disallowed message types from being executed through authz.

use std::collections::BTreeSet;

use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult};
use crate::tx::{Msg, Tx};

/// Nesting allowed for grant-exec envelopes.
pub const DEFAULT_MAX_NESTED_AUTHZ_DEPTH: usize = 5;

/// Rejects transactions that exercise a disabled message type on someone
/// else's behalf, or grant the right to.
///
/// A disabled type sent directly is allowed; only the delegated path is
/// blocked. A grant-exec directly in the transaction has depth 1 and every
/// enclosed grant-exec adds one. The depth counter of a message list is
/// shared by its grant-exec entries, so each later sibling starts one level
/// deeper than the one before it.
#[derive(Debug, Clone)]
pub struct AuthzLimiterDecorator {
    disabled_msgs: BTreeSet<String>,
    max_nested_depth: usize,
}

impl AuthzLimiterDecorator {
    pub fn new<I, S>(disabled_msgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled_msgs: disabled_msgs.into_iter().map(Into::into).collect(),
            max_nested_depth: DEFAULT_MAX_NESTED_AUTHZ_DEPTH,
        }
    }

    pub fn with_max_nested_depth(mut self, max_nested_depth: usize) -> Self {
        self.max_nested_depth = max_nested_depth;
        self
    }

    fn is_disabled(&self, type_url: &str) -> bool {
        self.disabled_msgs.contains(type_url)
    }

    fn disabled_error(type_url: &str) -> AnteError {
        AnteError::unauthorized(format!("found disabled msg type: {type_url}"))
    }

    /// Check `msgs` found inside an envelope at `depth` (0 = the tx).
    pub fn check_disabled_msgs(&self, msgs: &[Msg], depth: usize) -> AnteResult<()> {
        let mut nested_depth = depth;
        for msg in msgs {
            match msg {
                Msg::GrantExec { msgs: inner, .. } => {
                    nested_depth += 1;
                    if nested_depth > self.max_nested_depth {
                        return Err(AnteError::unauthorized(format!(
                            "found more nested msgs than permitted. Limit is : {}",
                            self.max_nested_depth
                        )));
                    }
                    self.check_disabled_msgs(inner, nested_depth)?;
                }
                Msg::GrantCreate {
                    authorized_type_url,
                    ..
                } => {
                    if self.is_disabled(authorized_type_url) {
                        return Err(Self::disabled_error(authorized_type_url));
                    }
                }
                Msg::Ethereum(_) | Msg::Plain { .. } => {
                    if depth > 0 && self.is_disabled(msg.type_url()) {
                        return Err(Self::disabled_error(msg.type_url()));
                    }
                }
            }
        }
        Ok(())
    }
}

impl AnteDecorator for AuthzLimiterDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        self.check_disabled_msgs(&tx.msgs, 0)
    }

    fn name(&self) -> &'static str {
        "AuthzLimiterDecorator"
    }
}
