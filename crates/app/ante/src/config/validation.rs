//! Configuration validation.
//!
//! Validates configuration and collects all errors before returning.

use crate::config::types::{AnteConfig, EvmConfig};
use crate::error::ConfigError;

/// Validate the entire ante configuration.
pub fn validate_config(config: &AnteConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_evm_config(&config.evm, &mut errors);
    validate_authz(config, &mut errors);
    validate_fees(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(errors))
    }
}

fn validate_evm_config(config: &EvmConfig, errors: &mut Vec<String>) {
    if config.chain_id == 0 {
        errors.push("evm.chain_id must be > 0".to_string());
    }
    if let Err(e) = config.coin_info().validate() {
        errors.push(format!("evm: {e}"));
    }
}

fn validate_authz(config: &AnteConfig, errors: &mut Vec<String>) {
    if config.max_nested_authz_depth == 0 {
        errors.push("max_nested_authz_depth must be > 0".to_string());
    }
    for type_url in &config.disabled_authz_msgs {
        if !type_url.starts_with('/') || type_url.len() < 2 {
            errors.push(format!(
                "disabled_authz_msgs entry '{type_url}' is not a type URL"
            ));
        }
    }
}

fn validate_fees(config: &AnteConfig, errors: &mut Vec<String>) {
    errors.extend(
        config
            .fee_market
            .validation_errors()
            .into_iter()
            .map(|e| format!("fee_market.{e}")),
    );

    // The local price is node policy and may not undercut the chain floor.
    let denom = &config.evm.denom;
    let local = config.min_gas_prices.amount_of(denom);
    if !local.is_zero() && local < config.fee_market.min_gas_price {
        errors.push(format!(
            "min_gas_prices {local}{denom} is below fee_market.min_gas_price {}",
            config.fee_market.min_gas_price
        ));
    }
}
