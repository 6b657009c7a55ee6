//! EIP-1559 fee market: parameters and the end-of-block base fee update.

use alloy_primitives::U256;
use serde::Deserialize;
use tracing::info;

use crate::context::{AnteContext, Event};
use crate::error::{AnteError, AnteResult};
use crate::keepers::FeeMarketKeeper;
use crate::math::Dec;

pub const DEFAULT_BASE_FEE: u64 = 1_000_000_000;
pub const DEFAULT_BASE_FEE_CHANGE_DENOMINATOR: u32 = 8;
pub const DEFAULT_ELASTICITY_MULTIPLIER: u32 = 2;

pub const EVENT_TYPE_FEE_MARKET: &str = "fee_market";
pub const EVENT_TYPE_BLOCK_GAS: &str = "block_gas";

/// Fee market parameters. Amounts are in the bank denom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeMarketParams {
    #[serde(default)]
    pub no_base_fee: bool,
    #[serde(default = "default_base_fee_change_denominator")]
    pub base_fee_change_denominator: u32,
    #[serde(default = "default_elasticity_multiplier")]
    pub elasticity_multiplier: u32,
    #[serde(default = "default_base_fee")]
    pub base_fee: Dec,
    #[serde(default)]
    pub enable_height: u64,
    /// Chain-wide minimum gas price.
    #[serde(default)]
    pub min_gas_price: Dec,
    /// Share of the block's gas wanted that counts toward the next base fee.
    #[serde(default = "default_min_gas_multiplier")]
    pub min_gas_multiplier: Dec,
}

const fn default_base_fee_change_denominator() -> u32 {
    DEFAULT_BASE_FEE_CHANGE_DENOMINATOR
}

const fn default_elasticity_multiplier() -> u32 {
    DEFAULT_ELASTICITY_MULTIPLIER
}

fn default_base_fee() -> Dec {
    Dec::from_u64(DEFAULT_BASE_FEE)
}

fn default_min_gas_multiplier() -> Dec {
    // 0.5 * 10^18
    Dec::from_raw(U256::from(500_000_000_000_000_000u64))
}

impl Default for FeeMarketParams {
    fn default() -> Self {
        Self {
            no_base_fee: false,
            base_fee_change_denominator: default_base_fee_change_denominator(),
            elasticity_multiplier: default_elasticity_multiplier(),
            base_fee: default_base_fee(),
            enable_height: 0,
            min_gas_price: Dec::ZERO,
            min_gas_multiplier: default_min_gas_multiplier(),
        }
    }
}

impl FeeMarketParams {
    /// Every problem with the parameters, naming the field.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.base_fee_change_denominator == 0 {
            errors.push("base_fee_change_denominator cannot be 0".to_string());
        }
        if self.elasticity_multiplier == 0 {
            errors.push("elasticity_multiplier cannot be 0".to_string());
        }
        if self.min_gas_multiplier > Dec::ONE {
            errors.push(format!(
                "min_gas_multiplier cannot be greater than 1: {}",
                self.min_gas_multiplier
            ));
        }
        errors
    }

    pub fn validate(&self) -> AnteResult<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AnteError::config(errors.join("; ")))
        }
    }

    pub fn is_base_fee_enabled(&self, height: u64) -> bool {
        !self.no_base_fee && height >= self.enable_height
    }
}

/// Base fee for the block after `height`.
///
/// Unchanged when the parent wanted exactly its target
/// (`gas_limit / elasticity`); raised by at least one unit above it and
/// lowered below it, but never under the minimum gas price. `None` when the
/// base fee is disabled. The enable height itself starts from the
/// configured base fee.
pub fn calculate_base_fee(
    params: &FeeMarketParams,
    height: u64,
    parent_base_fee: Dec,
    parent_gas_wanted: u64,
    block_gas_limit: Option<u64>,
) -> Option<Dec> {
    if !params.is_base_fee_enabled(height) {
        return None;
    }
    if height == params.enable_height {
        return Some(params.base_fee);
    }

    let gas_target = block_gas_limit
        .filter(|limit| *limit > 0)
        .map(|limit| limit / u64::from(params.elasticity_multiplier.max(1)))
        .filter(|target| *target > 0);
    let Some(gas_target) = gas_target else {
        return Some(parent_base_fee);
    };
    let denominator = U256::from(params.base_fee_change_denominator.max(1));

    let scaled_delta = |delta: u64| {
        parent_base_fee
            .checked_mul_int(U256::from(delta))
            .and_then(|v| v.checked_quo_int(U256::from(gas_target)))
            .and_then(|v| v.checked_quo_int(denominator))
    };

    match parent_gas_wanted.cmp(&gas_target) {
        std::cmp::Ordering::Equal => Some(parent_base_fee),
        std::cmp::Ordering::Greater => {
            let delta = scaled_delta(parent_gas_wanted - gas_target)
                .unwrap_or(Dec::ONE)
                .max(Dec::ONE);
            Some(
                parent_base_fee
                    .checked_add(delta)
                    .unwrap_or(Dec::from_raw(U256::MAX)),
            )
        }
        std::cmp::Ordering::Less => {
            let delta = scaled_delta(gas_target - parent_gas_wanted).unwrap_or(parent_base_fee);
            let lowered = parent_base_fee.checked_sub(delta).unwrap_or(Dec::ZERO);
            Some(lowered.max(params.min_gas_price))
        }
    }
}

/// Record the block's gas wanted and set the next base fee.
///
/// Gas wanted is `max(transient_gas_wanted * min_gas_multiplier, gas_used)`
/// so a block cannot move the base fee with gas it did not spend.
pub fn end_block(ctx: &mut AnteContext, keeper: &dyn FeeMarketKeeper) -> AnteResult<()> {
    let params = keeper.params();
    let gas_wanted = keeper.transient_gas_wanted(ctx);
    let gas_used = ctx.block.block_gas_meter.gas_used();

    let limited = Dec::from_u64(gas_wanted)
        .checked_mul(params.min_gas_multiplier)
        .ok_or_else(|| AnteError::out_of_gas(format!("gas wanted overflow: {gas_wanted}")))?
        .max(Dec::from_u64(gas_used));
    let updated_gas_wanted = u64::try_from(limited.truncate()).map_err(|_| {
        AnteError::out_of_gas(format!("block gas wanted does not fit u64: {limited}"))
    })?;
    keeper.set_block_gas_wanted(updated_gas_wanted);

    let height = ctx.block_height();
    let next_base_fee = calculate_base_fee(
        &params,
        height,
        keeper.base_fee(),
        updated_gas_wanted,
        ctx.block.block_gas_meter.limit(),
    );

    if let Some(base_fee) = next_base_fee {
        keeper.set_base_fee(base_fee);
        ctx.events.emit(
            Event::new(EVENT_TYPE_FEE_MARKET)
                .with_attribute("base_fee", base_fee.to_string())
                .with_attribute("calculated_at_block", height.to_string()),
        );
        info!(height, base_fee = %base_fee, gas_wanted = updated_gas_wanted, "updated base fee");
    }

    ctx.events.emit(
        Event::new(EVENT_TYPE_BLOCK_GAS)
            .with_attribute("height", height.to_string())
            .with_attribute("amount", updated_gas_wanted.to_string()),
    );
    Ok(())
}
