//! Public keys, signature gas, signature verification and sequences of
//! native transaction signers.

use std::sync::Arc;

use alloy_primitives::Address;
use tracing::debug;

use crate::chain::AnteDecorator;
use crate::context::AnteContext;
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::keepers::{Account, AccountKeeper};
use crate::signing::{
    verify_signature, PubKey, SignModeHandler, SignatureGasConsumer, SignatureVerifier,
    SignerData,
};
use crate::tx::Tx;

pub const DEFAULT_TX_SIG_LIMIT: usize = 7;

/// Charged in place of a missing key while simulating.
fn simulation_pub_key() -> PubKey {
    PubKey::EthSecp256k1(vec![0x02; 33])
}

fn signer_account(account_keeper: &dyn AccountKeeper, address: Address) -> AnteResult<Account> {
    account_keeper
        .get_account(address)
        .ok_or_else(|| AnteError::unknown_address(format!("account {address} does not exist")))
}

/// Stores the public key of each signer whose account has none yet.
pub struct SetPubKeyDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl SetPubKeyDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for SetPubKeyDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        for (index, (signer, info)) in tx.signers().into_iter().zip(&tx.signer_infos).enumerate() {
            let Some(pub_key) = &info.public_key else {
                continue;
            };
            if !simulate && pub_key.address()? != signer {
                return Err(AnteError::new(
                    ErrorKind::InvalidPubKey,
                    format!("pubKey does not match signer address {signer} with signer index: {index}"),
                ));
            }

            let mut account = signer_account(self.account_keeper.as_ref(), signer)?;
            if account.pub_key.is_some() {
                continue;
            }
            account.pub_key = Some(pub_key.clone());
            self.account_keeper.set_account(account);
            debug!(%signer, "set account public key");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SetPubKeyDecorator"
    }
}

/// Caps the number of keys a transaction may be signed with; multisig
/// members count individually.
pub struct ValidateSigCountDecorator {
    tx_sig_limit: usize,
}

impl ValidateSigCountDecorator {
    pub fn new(tx_sig_limit: usize) -> Self {
        Self { tx_sig_limit }
    }
}

impl Default for ValidateSigCountDecorator {
    fn default() -> Self {
        Self::new(DEFAULT_TX_SIG_LIMIT)
    }
}

impl AnteDecorator for ValidateSigCountDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        let count: usize = tx
            .signer_infos
            .iter()
            .filter_map(|info| info.public_key.as_ref())
            .map(PubKey::key_count)
            .sum();
        if count > self.tx_sig_limit {
            return Err(AnteError::new(
                ErrorKind::TooManySignatures,
                format!("signatures: {count}, limit: {}", self.tx_sig_limit),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ValidateSigCountDecorator"
    }
}

pub struct SigGasConsumeDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    gas_consumer: Arc<dyn SignatureGasConsumer>,
}

impl SigGasConsumeDecorator {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        gas_consumer: Arc<dyn SignatureGasConsumer>,
    ) -> Self {
        Self {
            account_keeper,
            gas_consumer,
        }
    }
}

impl AnteDecorator for SigGasConsumeDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        for (signer, info) in tx.signers().into_iter().zip(&tx.signer_infos) {
            let account = signer_account(self.account_keeper.as_ref(), signer)?;
            let pub_key = match account.pub_key {
                Some(pub_key) => pub_key,
                None if simulate => simulation_pub_key(),
                None => {
                    return Err(AnteError::new(
                        ErrorKind::InvalidPubKey,
                        "pubkey on account is not set",
                    ))
                }
            };
            self.gas_consumer
                .consume_sig_gas(&mut ctx.gas_meter, &pub_key, Some(&info.mode_info))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SigGasConsumeDecorator"
    }
}

/// Checks each signer's sequence and signature. Signatures are not checked
/// while simulating or on re-check.
pub struct SigVerificationDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    sign_mode_handler: Arc<dyn SignModeHandler>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl SigVerificationDecorator {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        sign_mode_handler: Arc<dyn SignModeHandler>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            account_keeper,
            sign_mode_handler,
            verifier,
        }
    }
}

impl AnteDecorator for SigVerificationDecorator {
    fn ante_handle(&self, ctx: &mut AnteContext, tx: &Tx, simulate: bool) -> AnteResult<()> {
        let signers = tx.signers();
        if tx.signatures.len() != signers.len() {
            return Err(AnteError::unauthorized(format!(
                "invalid number of signer; expected: {}, got {}",
                signers.len(),
                tx.signatures.len()
            )));
        }

        for ((signer, info), signature) in signers.into_iter().zip(&tx.signer_infos).zip(&tx.signatures) {
            let account = signer_account(self.account_keeper.as_ref(), signer)?;
            let Some(pub_key) = &account.pub_key else {
                if simulate {
                    continue;
                }
                return Err(AnteError::new(
                    ErrorKind::InvalidPubKey,
                    "pubkey on account is not set",
                ));
            };

            if info.sequence != account.sequence {
                return Err(AnteError::new(
                    ErrorKind::InvalidSequence,
                    format!(
                        "account sequence mismatch, expected {}, got {}",
                        account.sequence, info.sequence
                    ),
                ));
            }

            if simulate || ctx.is_recheck_tx() {
                continue;
            }

            let signer_data = SignerData {
                chain_id: ctx.chain_id().to_string(),
                account_number: account.account_number,
                sequence: account.sequence,
                address: signer,
            };
            if let Err(err) = verify_signature(
                self.sign_mode_handler.as_ref(),
                self.verifier.as_ref(),
                pub_key,
                &info.mode_info,
                signature,
                &signer_data,
                tx,
            ) {
                debug!(%signer, error = %err, "signature verification failed");
                return Err(AnteError::unauthorized(format!(
                    "signature verification failed; please verify account number ({}), sequence ({}) and chain-id ({})",
                    account.account_number,
                    account.sequence,
                    ctx.chain_id()
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SigVerificationDecorator"
    }
}

pub struct IncrementSequenceDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl IncrementSequenceDecorator {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl AnteDecorator for IncrementSequenceDecorator {
    fn ante_handle(&self, _ctx: &mut AnteContext, tx: &Tx, _simulate: bool) -> AnteResult<()> {
        for signer in tx.signers() {
            let mut account = signer_account(self.account_keeper.as_ref(), signer)?;
            account.sequence = account
                .sequence
                .checked_add(1)
                .ok_or_else(|| AnteError::new(ErrorKind::InvalidSequence, "sequence overflow"))?;
            self.account_keeper.set_account(account);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "IncrementSequenceDecorator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecMode, GasMeter};
    use crate::signing::{DefaultSigGasConsumer, DefaultSignModeHandler, EthSecp256k1Verifier, ModeInfo, SignMode};
    use crate::testing::{AnteFixture, TestSigner};
    use crate::tx::Msg;
    use alloy_primitives::U256;

    const SEND: &str = "/cosmos.bank.v1beta1.MsgSend";

    fn send_tx(signer: &TestSigner) -> Tx {
        let mut tx = Tx {
            msgs: vec![Msg::plain(SEND, signer.address())],
            ..Tx::default()
        };
        tx.fee.gas_limit = 100_000;
        tx
    }

    fn verifier(fixture: &AnteFixture) -> SigVerificationDecorator {
        SigVerificationDecorator::new(
            fixture.accounts.clone(),
            Arc::new(DefaultSignModeHandler),
            Arc::new(EthSecp256k1Verifier),
        )
    }

    #[test]
    fn test_set_pub_key_once() {
        let fixture = AnteFixture::new();
        let signer = TestSigner::new(1);
        fixture.create_funded_account(signer.address(), U256::ZERO);
        let mut ctx = fixture.context(ExecMode::Deliver);
        let mut tx = send_tx(&signer);
        fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);

        SetPubKeyDecorator::new(fixture.accounts.clone())
            .ante_handle(&mut ctx, &tx, false)
            .unwrap();
        let account = fixture.accounts.get_account(signer.address()).unwrap();
        assert_eq!(account.pub_key, Some(signer.pub_key()));
    }

    #[test]
    fn test_set_pub_key_rejects_foreign_key() {
        let fixture = AnteFixture::new();
        let signer = TestSigner::new(1);
        let other = TestSigner::new(2);
        fixture.create_funded_account(signer.address(), U256::ZERO);
        let mut ctx = fixture.context(ExecMode::Deliver);
        let mut tx = send_tx(&signer);
        fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);
        tx.signer_infos[0].public_key = Some(other.pub_key());

        let err = SetPubKeyDecorator::new(fixture.accounts.clone())
            .ante_handle(&mut ctx, &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPubKey);
        assert!(err.detail().ends_with("with signer index: 0"));
    }

    #[test]
    fn test_sig_count_counts_multisig_members() {
        let keys: Vec<PubKey> = (1..=8).map(|seed| TestSigner::new(seed).pub_key()).collect();
        let mut tx = Tx::default();
        tx.signer_infos.push(crate::tx::SignerInfo {
            public_key: Some(PubKey::Multisig {
                threshold: 1,
                public_keys: keys,
            }),
            mode_info: ModeInfo::Single(SignMode::Direct),
            sequence: 0,
        });
        let mut ctx = AnteContext::new("c", 1, ExecMode::Deliver);
        let err = ValidateSigCountDecorator::default()
            .ante_handle(&mut ctx, &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManySignatures);
        assert_eq!(err.detail(), "signatures: 8, limit: 7");
    }

    #[test]
    fn test_sig_gas_uses_dummy_key_when_simulating() {
        let fixture = AnteFixture::new();
        let signer = TestSigner::new(1);
        fixture.create_funded_account(signer.address(), U256::ZERO);
        let mut ctx = fixture.context(ExecMode::Simulate);
        ctx.gas_meter = GasMeter::finite(10_000);
        let mut tx = send_tx(&signer);
        fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);
        let decorator = SigGasConsumeDecorator::new(
            fixture.accounts.clone(),
            Arc::new(DefaultSigGasConsumer::default()),
        );

        decorator.ante_handle(&mut ctx, &tx, true).unwrap();
        assert_eq!(ctx.gas_meter.gas_used(), 1000);

        let err = decorator.ante_handle(&mut ctx, &tx, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPubKey);
    }

    #[test]
    fn test_verify_and_increment() {
        let fixture = AnteFixture::new();
        let signer = TestSigner::new(1);
        fixture.create_funded_account(signer.address(), U256::ZERO);
        let mut ctx = fixture.context(ExecMode::Deliver);
        let mut tx = send_tx(&signer);
        fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Eip712)]);
        SetPubKeyDecorator::new(fixture.accounts.clone())
            .ante_handle(&mut ctx, &tx, false)
            .unwrap();

        verifier(&fixture).ante_handle(&mut ctx, &tx, false).unwrap();
        IncrementSequenceDecorator::new(fixture.accounts.clone())
            .ante_handle(&mut ctx, &tx, false)
            .unwrap();
        assert_eq!(fixture.accounts.get_sequence(signer.address()).unwrap(), 1);

        let err = verifier(&fixture).ante_handle(&mut ctx, &tx, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSequence);
        assert_eq!(err.detail(), "account sequence mismatch, expected 1, got 0");
    }

    #[test]
    fn test_wrong_chain_id_fails_verification() {
        let fixture = AnteFixture::new();
        let signer = TestSigner::new(1);
        fixture.create_funded_account(signer.address(), U256::ZERO);
        let mut ctx = fixture.context(ExecMode::Deliver);
        let mut tx = send_tx(&signer);
        fixture.sign_tx(&ctx, &mut tx, &[(&signer, SignMode::Direct)]);
        SetPubKeyDecorator::new(fixture.accounts.clone())
            .ante_handle(&mut ctx, &tx, false)
            .unwrap();

        let mut other_chain = AnteContext::new("other_1-1", 1, ExecMode::Deliver);
        let err = verifier(&fixture)
            .ante_handle(&mut other_chain, &tx, false)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.detail().ends_with("and chain-id (other_1-1)"));

        assert!(verifier(&fixture).ante_handle(&mut other_chain, &tx, true).is_ok());
    }
}
