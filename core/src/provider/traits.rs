//! Provider Traits
//!
//! Trait definition for the remote contract-call layer. This abstraction
//! lets the SDK reason about streams without knowing how calls reach the
//! chain (JSON-RPC node, local fork, in-memory mock).
//!
//! # Design Philosophy
//!
//! The [`Provider`] trait covers exactly the capabilities the SDK needs:
//! - Read a contract field or view function
//! - Submit a state-changing call and get back a receipt with its logs
//! - Simulate a state-changing call without submitting it
//! - Query historical logs and subscribe to future ones
//!
//! Signing, fee estimation, and wire encoding are implementation details
//! behind this trait. Values cross the boundary as [`serde_json::Value`];
//! amounts travel as decimal strings and byte payloads as hex (see
//! [`crate::address::wire`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::address::{Address, TxHash};

/// A contract call: target, method name, and positional arguments.
#[derive(Clone, Debug)]
pub struct Call {
    /// The contract being called.
    pub contract: Address,
    /// Method name as exported by the contract.
    pub method: String,
    /// Positional arguments in wire form.
    pub args: Vec<Value>,
}

impl Call {
    /// Build a call.
    pub fn new(contract: Address, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            contract,
            method: method.into(),
            args,
        }
    }
}

/// Sender and fee context for state-changing calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxContext {
    /// The account submitting the transaction. Client-side checks that need
    /// a sender (allowance, funding-rate preview) are skipped when absent.
    pub sender: Option<Address>,
    /// Optional fee ceiling, in the chain's native fee units.
    pub max_fee: Option<u128>,
}

impl TxContext {
    /// Context with a sender and default fees.
    #[must_use]
    pub fn from_sender(sender: Address) -> Self {
        Self {
            sender: Some(sender),
            max_fee: None,
        }
    }
}

/// A log emitted by a contract during a transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    /// The contract that emitted the log.
    pub contract: Address,
    /// Event name.
    pub event: String,
    /// Decoded event parameters as a JSON object.
    pub params: Value,
    /// Hash of the transaction that emitted this log.
    pub transaction_hash: TxHash,
    /// Block the transaction landed in.
    pub block_number: u64,
}

/// Receipt of a submitted transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// Block the transaction landed in.
    pub block_number: u64,
    /// Logs emitted during execution, in emission order.
    pub logs: Vec<Log>,
}

/// Errors from the remote provider layer.
///
/// These propagate through the SDK unmodified; retrying a failed monetary
/// mutation without idempotency guarantees is unsafe by default, so the SDK
/// never does.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProviderError {
    /// The contract reverted the call.
    #[error("contract reverted: {reason}")]
    Revert {
        /// Revert reason string, as surfaced by the chain.
        reason: String,
    },

    /// The contract returned no data. Signals end-of-list when probing
    /// fixed-size on-chain arrays; not a failure in that context.
    #[error("no data returned for {method}")]
    NoData {
        /// The method that returned nothing.
        method: String,
    },

    /// A value from the provider failed to decode into a domain type.
    #[error("failed to decode {context}: {message}")]
    Decode {
        /// What was being decoded.
        context: String,
        /// Decoder error text.
        message: String,
    },

    /// Network or node failure.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No transaction with the given hash is known.
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
}

impl ProviderError {
    /// Decode failure helper.
    pub fn decode(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// The remote contract-call capability.
///
/// Implement this to connect the SDK to a chain. All methods are
/// independent round-trips; the chain serializes state transitions, so
/// implementations need no client-side locking.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs (e.g. "json-rpc", "mock").
    fn name(&self) -> &str;

    /// Read a contract field or view function.
    async fn read(&self, call: Call) -> Result<Value, ProviderError>;

    /// Submit a state-changing call and wait for its receipt.
    async fn submit(&self, call: Call, ctx: &TxContext) -> Result<Receipt, ProviderError>;

    /// Whether [`Provider::submit_batch`] lands all calls in one atomic
    /// submission. When `false`, the default sequential fallback applies.
    fn supports_batching(&self) -> bool {
        false
    }

    /// Submit several state-changing calls, returning one result per call.
    ///
    /// Providers with native batching should override this to land all
    /// calls at a single state height. The default falls back to sequential
    /// per-item submission; each item is independently fallible and partial
    /// success is surfaced per item, never swallowed.
    async fn submit_batch(
        &self,
        calls: Vec<Call>,
        ctx: &TxContext,
    ) -> Result<Vec<Result<Receipt, ProviderError>>, ProviderError> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.submit(call, ctx).await);
        }
        Ok(results)
    }

    /// Simulate a state-changing call without submitting it, returning its
    /// would-be return value.
    async fn simulate(&self, call: Call, ctx: &TxContext) -> Result<Value, ProviderError>;

    /// Query historical logs for one event of one contract.
    async fn get_logs(
        &self,
        contract: Address,
        event: &str,
        from_block: u64,
    ) -> Result<Vec<Log>, ProviderError>;

    /// Subscribe to an event stream, replaying from `from_block` first.
    ///
    /// The receiver yields an unbounded, non-restartable sequence; dropping
    /// it cancels the subscription. Consumers must tolerate out-of-order
    /// delivery across distinct event types.
    async fn subscribe(
        &self,
        contract: Address,
        event: &str,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Log>, ProviderError>;

    /// Fetch the receipt of a past transaction.
    async fn get_receipt(&self, transaction_hash: TxHash) -> Result<Receipt, ProviderError>;
}

/// Decoding helpers for values read back from a provider.
pub mod decode {
    use serde_json::Value;

    use super::ProviderError;
    use crate::address::Address;

    /// A token amount: decimal string on the wire.
    pub fn amount(value: &Value, context: &str) -> Result<u128, ProviderError> {
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ProviderError::decode(context, value))
    }

    /// A plain unsigned integer (timestamps, durations, counters).
    pub fn uint(value: &Value, context: &str) -> Result<u64, ProviderError> {
        value
            .as_u64()
            .ok_or_else(|| ProviderError::decode(context, value))
    }

    /// A boolean flag.
    pub fn boolean(value: &Value, context: &str) -> Result<bool, ProviderError> {
        value
            .as_bool()
            .ok_or_else(|| ProviderError::decode(context, value))
    }

    /// An address: hex string on the wire.
    pub fn address(value: &Value, context: &str) -> Result<Address, ProviderError> {
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ProviderError::decode(context, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_builder() {
        let call = Call::new(Address::from_low_u64(1), "streams", vec![1.into()]);
        assert_eq!(call.method, "streams");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn test_tx_context_from_sender() {
        let sender = Address::from_low_u64(9);
        let ctx = TxContext::from_sender(sender);
        assert_eq!(ctx.sender, Some(sender));
        assert_eq!(ctx.max_fee, None);
    }
}
