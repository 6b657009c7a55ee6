//! EIP-155 replay protection policy.

use crate::error::{TxError, TxResult};

/// Chain id check applied before trusting a recovered sender.
///
/// Typed transactions always commit to a chain id. Legacy transactions may
/// omit it; those are only admitted when `allow_unprotected` is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainIdPolicy {
    chain_id: u64,
    allow_unprotected: bool,
}

impl ChainIdPolicy {
    /// Reject transactions without EIP-155 protection.
    pub const fn strict(chain_id: u64) -> Self {
        Self {
            chain_id,
            allow_unprotected: false,
        }
    }

    /// Accept legacy transactions that carry no chain id.
    pub const fn permissive(chain_id: u64) -> Self {
        Self {
            chain_id,
            allow_unprotected: true,
        }
    }

    pub const fn new(chain_id: u64, allow_unprotected: bool) -> Self {
        Self {
            chain_id,
            allow_unprotected,
        }
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn verify(&self, tx_chain_id: Option<u64>) -> TxResult<()> {
        match tx_chain_id {
            Some(id) if id == self.chain_id => Ok(()),
            None if self.allow_unprotected => Ok(()),
            actual => Err(TxError::InvalidChainId {
                expected: self.chain_id,
                actual,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let policy = ChainIdPolicy::strict(9000);

        assert!(policy.verify(Some(9000)).is_ok());
        assert_eq!(
            policy.verify(Some(1)),
            Err(TxError::InvalidChainId {
                expected: 9000,
                actual: Some(1)
            })
        );
        assert!(policy.verify(None).is_err());
    }

    #[test]
    fn test_permissive_mode() {
        let policy = ChainIdPolicy::permissive(9000);

        assert!(policy.verify(None).is_ok());
        assert!(policy.verify(Some(5)).is_err());
    }
}
