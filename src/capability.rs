//! Caller identity handed to the engine.
//!
//! The engine never sees signature bytes. Whoever builds a `Capability`
//! (the signed request decoder, or a test) has already authenticated the
//! identity; the engine only compares it with stored authorities and uses
//! it as the authority on the caller's own token accounts.

use crate::address::Address;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability {
    identity: Address,
}

impl Capability {
    pub fn new(identity: Address) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn is(&self, address: &Address) -> bool {
        self.identity == *address
    }
}
