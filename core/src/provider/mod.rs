//! Remote Contract-Call Layer
//!
//! The SDK never talks to a chain directly; everything goes through the
//! [`Provider`] trait. [`mock::MockChain`] is an in-memory implementation
//! used by the test suite and the daemon's demo mode.

pub mod mock;
pub mod traits;

pub use traits::{decode, Call, Log, Provider, ProviderError, Receipt, TxContext};
