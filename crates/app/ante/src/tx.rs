//! Native transaction model shared by both admission paths.

use alloy_primitives::Address;
use borsh::BorshSerialize;
use evolve_tx_eth::{MsgEthereumTx, MSG_ETHEREUM_TX_TYPE_URL};

use crate::coins::Coins;
use crate::error::{AnteError, AnteResult, ErrorKind};
use crate::signing::{ModeInfo, PubKey};

/// Extension option marking a transaction as a wrapped Ethereum transaction.
pub const ETHEREUM_TX_EXTENSION_TYPE_URL: &str = "/cosmos.evm.vm.v1.ExtensionOptionsEthereumTx";
/// Extension option capping the tip a native transaction pays above the base fee.
pub const DYNAMIC_FEE_EXTENSION_TYPE_URL: &str = "/cosmos.evm.types.v1.ExtensionOptionDynamicFeeTx";
/// Executes inner messages on behalf of their signers.
pub const MSG_EXEC_TYPE_URL: &str = "/cosmos.authz.v1beta1.MsgExec";
/// Grants a grantee the right to execute a message type.
pub const MSG_GRANT_TYPE_URL: &str = "/cosmos.authz.v1beta1.MsgGrant";

/// Upper bound on the gas a transaction may request.
pub const MAX_GAS_WANTED: u64 = i64::MAX as u64;

/// A message carried by a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    Ethereum(Box<MsgEthereumTx>),
    Plain {
        type_url: String,
        signers: Vec<Address>,
        value: Vec<u8>,
    },
    /// Delegated execution of `msgs` by `grantee`.
    GrantExec { grantee: Address, msgs: Vec<Msg> },
    /// Authorizes `grantee` to execute `authorized_type_url` for `granter`.
    GrantCreate {
        granter: Address,
        grantee: Address,
        authorized_type_url: String,
    },
}

impl Msg {
    pub fn ethereum(msg: MsgEthereumTx) -> Self {
        Msg::Ethereum(Box::new(msg))
    }

    pub fn plain(type_url: impl Into<String>, signer: Address) -> Self {
        Msg::Plain {
            type_url: type_url.into(),
            signers: vec![signer],
            value: Vec::new(),
        }
    }

    pub fn type_url(&self) -> &str {
        match self {
            Msg::Ethereum(_) => MSG_ETHEREUM_TX_TYPE_URL,
            Msg::Plain { type_url, .. } => type_url,
            Msg::GrantExec { .. } => MSG_EXEC_TYPE_URL,
            Msg::GrantCreate { .. } => MSG_GRANT_TYPE_URL,
        }
    }

    pub fn signers(&self) -> Vec<Address> {
        match self {
            Msg::Ethereum(msg) => vec![msg.from()],
            Msg::Plain { signers, .. } => signers.clone(),
            Msg::GrantExec { grantee, .. } => vec![*grantee],
            Msg::GrantCreate { granter, .. } => vec![*granter],
        }
    }

    pub fn as_ethereum(&self) -> Option<&MsgEthereumTx> {
        match self {
            Msg::Ethereum(msg) => Some(msg),
            _ => None,
        }
    }

    fn doc(&self) -> MsgDoc {
        match self {
            Msg::Ethereum(msg) => MsgDoc::Ethereum {
                raw: msg.data().encode(),
                from: msg.from().0 .0,
            },
            Msg::Plain {
                type_url,
                signers,
                value,
            } => MsgDoc::Plain {
                type_url: type_url.clone(),
                signers: signers.iter().map(|s| s.0 .0).collect(),
                value: value.clone(),
            },
            Msg::GrantExec { grantee, msgs } => MsgDoc::GrantExec {
                grantee: grantee.0 .0,
                msgs: msgs.iter().map(Msg::doc).collect(),
            },
            Msg::GrantCreate {
                granter,
                grantee,
                authorized_type_url,
            } => MsgDoc::GrantCreate {
                granter: granter.0 .0,
                grantee: grantee.0 .0,
                authorized_type_url: authorized_type_url.clone(),
            },
        }
    }
}

#[derive(BorshSerialize)]
enum MsgDoc {
    Ethereum {
        raw: Vec<u8>,
        from: [u8; 20],
    },
    Plain {
        type_url: String,
        signers: Vec<[u8; 20]>,
        value: Vec<u8>,
    },
    GrantExec {
        grantee: [u8; 20],
        msgs: Vec<MsgDoc>,
    },
    GrantCreate {
        granter: [u8; 20],
        grantee: [u8; 20],
        authorized_type_url: String,
    },
}

#[derive(BorshSerialize)]
struct BodyDoc {
    msgs: Vec<MsgDoc>,
    memo: String,
    timeout_height: u64,
    extension_options: Vec<(String, Vec<u8>)>,
    fee_amount: Vec<(String, [u8; 32])>,
    gas_limit: u64,
    payer: Option<[u8; 20]>,
    granter: Option<[u8; 20]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionOption {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl ExtensionOption {
    pub fn ethereum_tx() -> Self {
        Self {
            type_url: ETHEREUM_TX_EXTENSION_TYPE_URL.to_string(),
            value: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fee {
    pub amount: Coins,
    pub gas_limit: u64,
    /// Pays the fee instead of the first signer; must sign the tx.
    pub payer: Option<Address>,
    /// Account whose fee allowance covers the fee.
    pub granter: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    /// Required only while the account has no key on chain.
    pub public_key: Option<PubKey>,
    pub mode_info: ModeInfo,
    pub sequence: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tx {
    pub msgs: Vec<Msg>,
    pub memo: String,
    pub timeout_height: u64,
    pub extension_options: Vec<ExtensionOption>,
    pub fee: Fee,
    pub signer_infos: Vec<SignerInfo>,
    pub signatures: Vec<Vec<u8>>,
}

impl Tx {
    /// Wrap Ethereum messages: marker extension, fee gas and amount taken
    /// from the messages, no signatures.
    pub fn ethereum(msgs: Vec<MsgEthereumTx>, fee_amount: Coins) -> Self {
        let gas_limit = msgs
            .iter()
            .fold(0u64, |total, msg| total.saturating_add(msg.gas()));
        Self {
            msgs: msgs.into_iter().map(Msg::ethereum).collect(),
            extension_options: vec![ExtensionOption::ethereum_tx()],
            fee: Fee {
                amount: fee_amount,
                gas_limit,
                payer: None,
                granter: None,
            },
            ..Self::default()
        }
    }

    pub fn gas(&self) -> u64 {
        self.fee.gas_limit
    }

    /// Unique signers in order of first appearance.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = Vec::new();
        for signer in self.msgs.iter().flat_map(Msg::signers) {
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        if let Some(payer) = self.fee.payer {
            if !signers.contains(&payer) {
                signers.push(payer);
            }
        }
        signers
    }

    /// Explicit fee payer, else the first signer.
    pub fn fee_payer(&self) -> Option<Address> {
        self.fee
            .payer
            .or_else(|| self.msgs.iter().flat_map(Msg::signers).next())
    }

    pub fn is_ethereum(&self) -> bool {
        self.extension_options
            .first()
            .is_some_and(|opt| opt.type_url == ETHEREUM_TX_EXTENSION_TYPE_URL)
    }

    /// Stateless checks on a native transaction.
    pub fn validate_basic(&self) -> AnteResult<()> {
        if self.msgs.is_empty() {
            return Err(AnteError::invalid_request("must contain at least one message"));
        }
        if self.fee.gas_limit > MAX_GAS_WANTED {
            return Err(AnteError::invalid_request(format!(
                "invalid gas supplied; {} > {MAX_GAS_WANTED}",
                self.fee.gas_limit
            )));
        }
        if self.signatures.is_empty() {
            return Err(AnteError::new(ErrorKind::NoSignatures, ""));
        }
        let signers = self.signers();
        if self.signatures.len() != signers.len() {
            return Err(AnteError::unauthorized(format!(
                "wrong number of signers; expected {}, got {}",
                signers.len(),
                self.signatures.len()
            )));
        }
        if self.signer_infos.len() != self.signatures.len() {
            return Err(AnteError::unauthorized(format!(
                "invalid number of signer infos; expected {}, got {}",
                self.signatures.len(),
                self.signer_infos.len()
            )));
        }
        Ok(())
    }

    /// Canonical encoding of everything signers commit to.
    pub fn body_bytes(&self) -> AnteResult<Vec<u8>> {
        let doc = BodyDoc {
            msgs: self.msgs.iter().map(Msg::doc).collect(),
            memo: self.memo.clone(),
            timeout_height: self.timeout_height,
            extension_options: self
                .extension_options
                .iter()
                .map(|opt| (opt.type_url.clone(), opt.value.clone()))
                .collect(),
            fee_amount: self
                .fee
                .amount
                .iter()
                .map(|coin| (coin.denom.clone(), coin.amount.to_be_bytes::<32>()))
                .collect(),
            gas_limit: self.fee.gas_limit,
            payer: self.fee.payer.map(|a| a.0 .0),
            granter: self.fee.granter.map(|a| a.0 .0),
        };
        borsh::to_vec(&doc).map_err(|e| AnteError::invalid_request(e.to_string()))
    }
}
