//! Admission of native transactions through the full handler.

use alloy_primitives::{Address, U256};
use evolve_ante::cosmos::ExtensionOptionDynamicFeeTx;
use evolve_ante::feemarket::DEFAULT_BASE_FEE;
use evolve_ante::memory::{module_address, FEE_COLLECTOR};
use evolve_ante::signing::{ModeInfo, MultiSignature, PubKey, SignMode, SignerData};
use evolve_ante::testing::{AnteFixture, TestSigner};
use evolve_ante::{
    AccountKeeper, AnteError, AnteHandler, AnteResult, BankKeeper, Coins, Dec, ErrorKind,
    ExecMode, FeeMarketKeeper, Msg, SignerInfo, Tx,
};

const SEND: &str = "/cosmos.bank.v1beta1.MsgSend";
const DELEGATE: &str = "/cosmos.staking.v1beta1.MsgDelegate";

/// Twice the default base fee, leaving a tip of one base fee per gas.
const GAS_PRICE: u64 = 2 * DEFAULT_BASE_FEE;

fn one_ether() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

fn fee_at(price: u64, gas: u64) -> U256 {
    U256::from(price) * U256::from(gas)
}

fn send_from(signer: Address, fee: U256, gas: u64) -> Tx {
    let mut tx = Tx {
        msgs: vec![Msg::plain(SEND, signer)],
        ..Tx::default()
    };
    tx.fee.amount = Coins::single("aevm", fee);
    tx.fee.gas_limit = gas;
    tx
}

fn balance(fixture: &AnteFixture, address: Address) -> U256 {
    fixture.bank.balance(address, "aevm").amount
}

#[test]
fn test_single_signer_admitted() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let fee = fee_at(GAS_PRICE, 200_000);
    let mut tx = send_from(signer.address(), fee, 200_000);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    handler.handle(&mut ctx, &tx, false).unwrap();

    assert_eq!(balance(&fixture, signer.address()), one_ether() - fee);
    assert_eq!(balance(&fixture, module_address(FEE_COLLECTOR)), fee);
    let account = fixture.accounts.get_account(signer.address()).unwrap();
    assert_eq!(account.sequence, 1);
    assert_eq!(account.pub_key, Some(signer.pub_key()));
    assert_eq!(ctx.priority(), DEFAULT_BASE_FEE);
    assert_eq!(ctx.gas_meter.limit(), Some(200_000));
    assert_eq!(ctx.gas_meter.gas_used(), 1000);
    assert_eq!(ctx.block.transient_gas_wanted(), 200_000);

    // replaying the same signature now fails on the sequence
    let err = handler
        .handle(&mut fixture.context(ExecMode::Deliver), &tx, false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSequence);
}

#[test]
fn test_fee_below_base_fee_rejected() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(signer.address(), fee_at(1, 100_000), 100_000);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFee);
    assert!(err.detail().starts_with("gas prices too low"), "{err}");
    assert_eq!(balance(&fixture, signer.address()), one_ether());
    assert_eq!(fixture.accounts.get_sequence(signer.address()).unwrap(), 0);
}

#[test]
fn test_fee_at_base_fee_admitted() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let fee = fee_at(DEFAULT_BASE_FEE, 100_000);
    let mut tx = send_from(signer.address(), fee, 100_000);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    handler.handle(&mut ctx, &tx, false).unwrap();
    assert_eq!(balance(&fixture, module_address(FEE_COLLECTOR)), fee);
    assert_eq!(ctx.priority(), 0);
}

#[test]
fn test_dynamic_fee_option_caps_tip() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(signer.address(), fee_at(GAS_PRICE, 100_000), 100_000);
    tx.extension_options =
        vec![ExtensionOptionDynamicFeeTx::new(Dec::from_u64(5)).to_extension_option()];
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    handler.handle(&mut ctx, &tx, false).unwrap();
    let charged = fee_at(DEFAULT_BASE_FEE + 5, 100_000);
    assert_eq!(balance(&fixture, module_address(FEE_COLLECTOR)), charged);
    assert_eq!(balance(&fixture, signer.address()), one_ether() - charged);
    assert_eq!(ctx.priority(), 5);
}

#[test]
fn test_pre_london_fee_follows_node_policy() {
    let fixture = AnteFixture::pre_london();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(signer.address(), fee_at(1, 100_000), 100_000);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    handler.handle(&mut ctx, &tx, false).unwrap();
    assert_eq!(ctx.priority(), 1);
}

#[test]
fn test_gas_exhausted_by_signature_cost() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(signer.address(), fee_at(GAS_PRICE, 999), 999);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfGas);
}

struct Multisig {
    signers: Vec<TestSigner>,
    pub_key: PubKey,
    address: Address,
}

impl Multisig {
    fn new(threshold: u32) -> AnteResult<Self> {
        let signers: Vec<TestSigner> = (11..=13).map(TestSigner::new).collect();
        let pub_key = PubKey::Multisig {
            threshold,
            public_keys: signers.iter().map(TestSigner::pub_key).collect(),
        };
        let address = pub_key.address()?;
        Ok(Self {
            signers,
            pub_key,
            address,
        })
    }

    /// Sign with the members at `selected`, in ascending member order,
    /// each with its own mode.
    fn sign(
        &self,
        fixture: &AnteFixture,
        chain_id: &str,
        tx: &mut Tx,
        selected: &[(usize, SignMode)],
    ) -> AnteResult<()> {
        let account = fixture
            .accounts
            .get_account(self.address)
            .ok_or_else(|| AnteError::unknown_address("multisig account does not exist"))?;
        let signer_data = SignerData {
            chain_id: chain_id.to_string(),
            account_number: account.account_number,
            sequence: account.sequence,
            address: self.address,
        };

        let bitarray = (0..self.signers.len())
            .map(|member| selected.iter().any(|(index, _)| *index == member))
            .collect();
        let mut mode_infos = Vec::new();
        let mut signatures = Vec::new();
        for (index, mode) in selected {
            let member = self.signers.get(*index).ok_or_else(|| {
                AnteError::invalid_request(format!("multisig has no member {index}"))
            })?;
            mode_infos.push(ModeInfo::Single(*mode));
            signatures.push(member.sign_for(*mode, &signer_data, tx));
        }

        tx.signer_infos = vec![SignerInfo {
            public_key: Some(self.pub_key.clone()),
            mode_info: ModeInfo::Multi {
                bitarray,
                mode_infos,
            },
            sequence: account.sequence,
        }];
        tx.signatures = vec![MultiSignature { signatures }.encode()?];
        Ok(())
    }
}

#[test]
fn test_mixed_mode_multisig_at_threshold() {
    let fixture = AnteFixture::new();
    let multisig = Multisig::new(2).unwrap();
    fixture.create_funded_account(multisig.address, one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(multisig.address, fee_at(GAS_PRICE, 100_000), 100_000);
    multisig
        .sign(
            &fixture,
            ctx.chain_id(),
            &mut tx,
            &[(0, SignMode::Direct), (2, SignMode::Eip712)],
        )
        .unwrap();

    handler.handle(&mut ctx, &tx, false).unwrap();
    assert_eq!(ctx.gas_meter.gas_used(), 2000);
    assert_eq!(fixture.accounts.get_sequence(multisig.address).unwrap(), 1);
}

#[test]
fn test_mixed_mode_multisig_below_threshold() {
    let fixture = AnteFixture::new();
    let multisig = Multisig::new(2).unwrap();
    fixture.create_funded_account(multisig.address, one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(multisig.address, fee_at(GAS_PRICE, 100_000), 100_000);
    multisig
        .sign(&fixture, ctx.chain_id(), &mut tx, &[(1, SignMode::Eip712)])
        .unwrap();

    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.detail().starts_with("signature verification failed"));
    assert_eq!(fixture.accounts.get_sequence(multisig.address).unwrap(), 0);
}

#[test]
fn test_multisig_sub_signature_mode_must_match() {
    let fixture = AnteFixture::new();
    let multisig = Multisig::new(2).unwrap();
    fixture.create_funded_account(multisig.address, one_ether());
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(multisig.address, fee_at(GAS_PRICE, 100_000), 100_000);
    multisig
        .sign(
            &fixture,
            ctx.chain_id(),
            &mut tx,
            &[(0, SignMode::Direct), (1, SignMode::Direct)],
        )
        .unwrap();
    // claim EIP-712 for a signature made over the direct sign bytes
    if let ModeInfo::Multi { mode_infos, .. } = &mut tx.signer_infos[0].mode_info {
        mode_infos[1] = ModeInfo::Single(SignMode::Eip712);
    }

    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn test_fee_granter_pays_through_handler() {
    let fixture = AnteFixture::new();
    let grantee = TestSigner::new(1);
    let granter = Address::repeat_byte(0x77);
    let fee = fee_at(GAS_PRICE, 100_000);
    fixture.create_funded_account(grantee.address(), U256::ZERO);
    fixture.create_funded_account(granter, one_ether());
    fixture.feegrant.grant_allowance(
        granter,
        grantee.address(),
        Coins::single("aevm", fee * U256::from(5u64)),
    );
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut tx = send_from(grantee.address(), fee, 100_000);
    tx.fee.granter = Some(granter);
    fixture.sign_tx(&ctx, &mut tx, &[(&grantee, SignMode::LegacyAminoJson)]);

    handler.handle(&mut ctx, &tx, false).unwrap();
    assert_eq!(balance(&fixture, granter), one_ether() - fee);
    assert_eq!(balance(&fixture, grantee.address()), U256::ZERO);

    let mut without_feegrant = fixture.handler_options();
    without_feegrant.feegrant_keeper = None;
    let handler = AnteHandler::new(without_feegrant).unwrap();
    let mut ctx = fixture.context(ExecMode::Deliver);
    fixture.sign_tx(&ctx, &mut tx, &[(&grantee, SignMode::LegacyAminoJson)]);
    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(err.detail(), "fee grants are not enabled");
}

#[test]
fn test_authz_limiter_in_handler() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let handler =
        AnteHandler::new(fixture.handler_options().disabled_authz_msgs([DELEGATE])).unwrap();

    // allowed when not delegated
    let mut ctx = fixture.context(ExecMode::Deliver);
    let mut direct = Tx {
        msgs: vec![Msg::plain(DELEGATE, signer.address())],
        ..Tx::default()
    };
    direct.fee.amount = Coins::single("aevm", fee_at(GAS_PRICE, 100_000));
    direct.fee.gas_limit = 100_000;
    fixture.sign_tx(&ctx, &mut direct, &[(&signer, SignMode::Direct)]);
    handler.handle(&mut ctx, &direct, false).unwrap();

    let mut delegated = Tx {
        msgs: vec![Msg::GrantExec {
            grantee: signer.address(),
            msgs: vec![Msg::plain(DELEGATE, Address::repeat_byte(0x55))],
        }],
        ..Tx::default()
    };
    delegated.fee.amount = Coins::single("aevm", fee_at(GAS_PRICE, 100_000));
    delegated.fee.gas_limit = 100_000;
    let mut ctx = fixture.context(ExecMode::Deliver);
    fixture.sign_tx(&ctx, &mut delegated, &[(&signer, SignMode::Direct)]);

    let err = handler.handle(&mut ctx, &delegated, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(err.detail(), format!("found disabled msg type: {DELEGATE}"));
    assert_eq!(fixture.accounts.get_sequence(signer.address()).unwrap(), 1);
}

#[test]
fn test_global_min_gas_price_in_handler() {
    let fixture = AnteFixture::new();
    let signer = TestSigner::new(1);
    fixture.create_funded_account(signer.address(), one_ether());
    let mut params = fixture.fee_market.params();
    params.min_gas_price = "2".parse().unwrap();
    fixture.fee_market.set_params(params);
    let handler = AnteHandler::new(fixture.handler_options()).unwrap();

    let mut ctx = fixture.context(ExecMode::CheckTx);
    let mut tx = send_from(signer.address(), U256::from(100_000u64), 100_000);
    fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

    let err = handler.handle(&mut ctx, &tx, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFee);
    assert!(err.detail().contains("(100000aevm < 200000aevm)"));
    assert_eq!(balance(&fixture, signer.address()), one_ether());
}

#[test]
fn test_missing_collaborators_fail_construction() {
    let mut options = AnteFixture::new().handler_options();
    options.sign_mode_handler = None;
    let err = AnteHandler::new(options).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.detail(), "sign mode handler is required for AnteHandler");
}
