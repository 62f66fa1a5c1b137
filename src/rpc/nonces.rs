//! Per-signer replay protection.

use super::RequestError;
use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NonceTracker {
    last: HashMap<Address, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted nonce for a signer, 0 if none
    pub fn last(&self, signer: &Address) -> u64 {
        self.last.get(signer).copied().unwrap_or(0)
    }

    /// Accept `nonce` if it is strictly greater than the last one seen
    pub fn consume(&mut self, signer: Address, nonce: u64) -> Result<(), RequestError> {
        let last = self.last(&signer);
        if nonce <= last {
            return Err(RequestError::NonceReused { signer, nonce, last });
        }
        self.last.insert(signer, nonce);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_must_increase() {
        let mut nonces = NonceTracker::new();
        let alice = Address([1; 32]);

        nonces.consume(alice, 1).unwrap();
        nonces.consume(alice, 5).unwrap();
        assert_eq!(nonces.last(&alice), 5);

        assert_eq!(
            nonces.consume(alice, 5),
            Err(RequestError::NonceReused { signer: alice, nonce: 5, last: 5 })
        );
        assert!(nonces.consume(alice, 3).is_err());
        assert_eq!(nonces.last(&alice), 5);
    }

    #[test]
    fn test_nonce_zero_never_accepted() {
        let mut nonces = NonceTracker::new();
        assert!(nonces.consume(Address([1; 32]), 0).is_err());
        assert!(nonces.is_empty());
    }

    #[test]
    fn test_signers_are_independent() {
        let mut nonces = NonceTracker::new();
        nonces.consume(Address([1; 32]), 7).unwrap();
        nonces.consume(Address([2; 32]), 1).unwrap();
        assert_eq!(nonces.len(), 2);
    }
}
