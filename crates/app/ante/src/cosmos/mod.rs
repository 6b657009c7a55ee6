//! Decorators of the native transaction chain.

pub mod authz;
pub mod basic;
pub mod dynamic_fee;
pub mod fee;
pub mod min_gas_price;
pub mod setup;
pub mod sigverify;

pub use authz::{AuthzLimiterDecorator, DEFAULT_MAX_NESTED_AUTHZ_DEPTH};
pub use basic::{
    RejectMessagesDecorator, TxTimeoutHeightDecorator, ValidateBasicDecorator,
    ValidateMemoDecorator, DEFAULT_MAX_MEMO_CHARACTERS,
};
pub use dynamic_fee::{DynamicFeeChecker, DynamicFeeExtensionChecker, ExtensionOptionDynamicFeeTx};
pub use fee::{
    check_tx_fee_with_validator_min_gas_prices, DeductFeeDecorator, TxFeeChecker,
    ValidatorMinGasPriceChecker,
};
pub use min_gas_price::MinGasPriceDecorator;
pub use setup::{ExtensionOptionsDecorator, SetUpContextDecorator};
pub use sigverify::{
    IncrementSequenceDecorator, SetPubKeyDecorator, SigGasConsumeDecorator,
    SigVerificationDecorator, ValidateSigCountDecorator, DEFAULT_TX_SIG_LIMIT,
};
