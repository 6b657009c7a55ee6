//! Per-transaction context threaded through every admission step.

use crate::coins::DecCoins;
use crate::error::{AnteError, AnteResult};

/// Tracks gas consumption for a transaction or a block.
///
/// - **Infinite** mode: consumption is recorded but never fails. An optional
///   limit is carried for reporting.
/// - **Finite** mode: consumption beyond `gas_limit` fails with out of gas.
///
/// # Examples
///
/// ```
/// use evolve_ante::context::GasMeter;
///
/// let mut meter = GasMeter::finite(1000);
/// meter.consume_gas(200, "signature").unwrap();
/// assert!(meter.consume_gas(10_000, "signature").is_err());
///
/// let mut unbounded = GasMeter::infinite();
/// unbounded.consume_gas(9_999_999, "setup").unwrap();
/// assert_eq!(unbounded.gas_used(), 9_999_999);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasMeter {
    Infinite {
        gas_limit: Option<u64>,
        gas_used: u64,
    },
    Finite {
        gas_limit: u64,
        gas_used: u64,
    },
}

impl Default for GasMeter {
    fn default() -> Self {
        Self::infinite()
    }
}

impl GasMeter {
    pub fn infinite() -> Self {
        GasMeter::Infinite {
            gas_limit: None,
            gas_used: 0,
        }
    }

    /// Never fails, but reports `gas_limit` as its limit.
    pub fn infinite_with_limit(gas_limit: u64) -> Self {
        GasMeter::Infinite {
            gas_limit: Some(gas_limit),
            gas_used: 0,
        }
    }

    pub fn finite(gas_limit: u64) -> Self {
        GasMeter::Finite {
            gas_limit,
            gas_used: 0,
        }
    }

    /// Consume `gas`, naming the operation in the error on exhaustion.
    pub fn consume_gas(&mut self, gas: u64, descriptor: &str) -> AnteResult<()> {
        match self {
            GasMeter::Infinite { gas_used, .. } => {
                *gas_used = gas_used.saturating_add(gas);
                Ok(())
            }
            GasMeter::Finite {
                gas_limit,
                gas_used,
            } => {
                let new_gas_used = gas_used.saturating_add(gas);
                if new_gas_used > *gas_limit {
                    return Err(AnteError::out_of_gas(format!(
                        "out of gas in location: {descriptor}; gasWanted: {gas_limit}, gasUsed: {new_gas_used}"
                    )));
                }
                *gas_used = new_gas_used;
                Ok(())
            }
        }
    }

    pub fn gas_used(&self) -> u64 {
        match self {
            GasMeter::Infinite { gas_used, .. } | GasMeter::Finite { gas_used, .. } => *gas_used,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match self {
            GasMeter::Infinite { gas_limit, .. } => *gas_limit,
            GasMeter::Finite { gas_limit, .. } => Some(*gas_limit),
        }
    }

    /// Gas still available; unbounded meters report `u64::MAX`.
    pub fn remaining(&self) -> u64 {
        match self {
            GasMeter::Infinite { .. } => u64::MAX,
            GasMeter::Finite {
                gas_limit,
                gas_used,
            } => gas_limit.saturating_sub(*gas_used),
        }
    }
}

/// State shared by every transaction of the block being built or checked.
///
/// Reset by [`BlockState::begin_block`] from the block loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockState {
    pub block_gas_meter: GasMeter,
    transient_gas_wanted: u64,
}

impl BlockState {
    /// Fresh state for a block with the given gas limit (`None` = unbounded).
    pub fn begin_block(block_gas_limit: Option<u64>) -> Self {
        let block_gas_meter = match block_gas_limit {
            Some(limit) => GasMeter::finite(limit),
            None => GasMeter::infinite(),
        };
        Self {
            block_gas_meter,
            transient_gas_wanted: 0,
        }
    }

    pub fn transient_gas_wanted(&self) -> u64 {
        self.transient_gas_wanted
    }

    /// Add a transaction's contribution, returning the new total.
    pub fn add_transient_gas_wanted(&mut self, gas_wanted: u64) -> AnteResult<u64> {
        self.transient_gas_wanted = self
            .transient_gas_wanted
            .checked_add(gas_wanted)
            .ok_or_else(|| {
                AnteError::out_of_gas(format!(
                    "transient gas wanted overflow: {} + {gas_wanted}",
                    self.transient_gas_wanted
                ))
            })?;
        Ok(self.transient_gas_wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// A typed event with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Events emitted while admitting a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventManager {
    events: Vec<Event>,
}

impl EventManager {
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Why the node is running the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// First admission into the local mempool.
    #[default]
    CheckTx,
    /// Re-admission of a mempool transaction after a block commit.
    ReCheckTx,
    /// Block inclusion.
    Deliver,
    /// Gas estimation.
    Simulate,
}

/// Context handed to each step; steps may replace its gas meter, emit
/// events and update the block state.
#[derive(Debug, Clone)]
pub struct AnteContext {
    chain_id: String,
    block_height: u64,
    exec_mode: ExecMode,
    min_gas_prices: DecCoins,
    priority: u64,
    pub gas_meter: GasMeter,
    pub block: BlockState,
    pub events: EventManager,
}

impl AnteContext {
    pub fn new(chain_id: impl Into<String>, block_height: u64, exec_mode: ExecMode) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            exec_mode,
            min_gas_prices: DecCoins::default(),
            priority: 0,
            gas_meter: GasMeter::infinite(),
            block: BlockState::default(),
            events: EventManager::default(),
        }
    }

    /// Set the node's local minimum gas prices.
    pub fn with_min_gas_prices(mut self, min_gas_prices: DecCoins) -> Self {
        self.min_gas_prices = min_gas_prices;
        self
    }

    pub fn with_block_state(mut self, block: BlockState) -> Self {
        self.block = block;
        self
    }

    pub fn with_exec_mode(mut self, exec_mode: ExecMode) -> Self {
        self.exec_mode = exec_mode;
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }

    /// Mempool admission, first time or re-check.
    pub fn is_check_tx(&self) -> bool {
        matches!(self.exec_mode, ExecMode::CheckTx | ExecMode::ReCheckTx)
    }

    pub fn is_recheck_tx(&self) -> bool {
        self.exec_mode == ExecMode::ReCheckTx
    }

    pub fn min_gas_prices(&self) -> &DecCoins {
        &self.min_gas_prices
    }

    pub fn priority(&self) -> u64 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u64) {
        self.priority = priority;
    }

    /// Start a new transaction on the same block: fresh gas meter, events
    /// and priority; block state carries over.
    pub fn next_tx(&mut self) {
        self.gas_meter = GasMeter::infinite();
        self.events.clear();
        self.priority = 0;
    }
}
