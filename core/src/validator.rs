//! Validator Handles
//!
//! A validator is a stateless policy contract consulted at stream-creation
//! time: `validate(funder, token, amount, products)` returns the per-second
//! rate that validator assigns to the proposed stream, or reverts to reject
//! it. Handles compare and hash by address, and order by the address's
//! numeric value so validator lists stay canonical (sorted, deduplicated)
//! before being written back on-chain.

use std::cmp::Ordering;

use serde_json::{json, Value};

use crate::address::Address;
use crate::error::StreamError;
use crate::manager::StreamManager;
use crate::provider::{decode, Call, ProviderError, TxContext};

/// A validator contract bound to a specific stream manager.
///
/// The binding matters: a validator can serve more than one manager, so
/// evaluations are simulated with the manager as the caller.
#[derive(Clone, Debug)]
pub struct Validator {
    address: Address,
    manager: StreamManager,
}

impl Validator {
    /// Bind a validator address to a manager.
    #[must_use]
    pub fn new(address: Address, manager: StreamManager) -> Self {
        Self { address, manager }
    }

    /// The validator's contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Evaluate the proposed stream, returning this validator's per-second
    /// rate contribution.
    ///
    /// A contract-level rejection surfaces as
    /// [`StreamError::ValidatorFailed`] naming this validator; transport
    /// and decode failures pass through unmodified.
    pub async fn validate(
        &self,
        funder: Address,
        token: Address,
        amount: u128,
        products: &[Vec<u8>],
    ) -> Result<u128, StreamError> {
        let products: Vec<String> = products
            .iter()
            .map(|p| format!("0x{}", hex::encode(p)))
            .collect();
        let call = Call::new(
            self.address,
            "validate",
            vec![
                json!(funder.to_string()),
                json!(token.to_string()),
                json!(amount.to_string()),
                Value::from(products),
            ],
        );

        // Simulate as the manager: validators may answer differently
        // depending on which manager is asking.
        let ctx = TxContext::from_sender(self.manager.address());
        match self.manager.provider().simulate(call, &ctx).await {
            Ok(value) => Ok(decode::amount(&value, "validate return")?),
            Err(ProviderError::Revert { .. }) => Err(StreamError::ValidatorFailed {
                validator: self.address,
            }),
            Err(err) => Err(err.into()),
        }
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Validator {}

impl std::hash::Hash for Validator {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl PartialOrd for Validator {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Validator {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }
}

impl std::fmt::Display for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validator({})", self.address)
    }
}

/// A heterogeneous reference to a validator: a bare address or an
/// already-resolved handle. Set operations normalize everything to the
/// canonical address before comparing.
#[derive(Clone, Debug)]
pub enum ValidatorRef {
    /// Referenced by address only.
    Address(Address),
    /// An already-resolved handle.
    Handle(Validator),
}

impl ValidatorRef {
    /// The canonical address of the referenced validator.
    #[must_use]
    pub fn address(&self) -> Address {
        match self {
            Self::Address(address) => *address,
            Self::Handle(validator) => validator.address(),
        }
    }
}

impl From<Address> for ValidatorRef {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<Validator> for ValidatorRef {
    fn from(validator: Validator) -> Self {
        Self::Handle(validator)
    }
}

impl From<&Validator> for ValidatorRef {
    fn from(validator: &Validator) -> Self {
        Self::Handle(validator.clone())
    }
}

/// Sort and deduplicate validator references by address.
#[must_use]
pub fn canonicalize(refs: &[ValidatorRef]) -> Vec<Address> {
    let mut addresses: Vec<Address> = refs.iter().map(ValidatorRef::address).collect();
    addresses.sort_unstable();
    addresses.dedup();
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_sorts_and_dedups() {
        let a = Address::from_low_u64(3);
        let b = Address::from_low_u64(1);
        let refs: Vec<ValidatorRef> = vec![a.into(), b.into(), a.into()];
        assert_eq!(canonicalize(&refs), vec![b, a]);
    }

    #[test]
    fn test_ref_address_passthrough() {
        let addr = Address::from_low_u64(9);
        assert_eq!(ValidatorRef::from(addr).address(), addr);
    }
}
