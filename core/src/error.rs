//! Domain Error Taxonomy
//!
//! Every failure a caller can recover from is a named variant carrying the
//! structured data needed to render an actionable message. Provider failures
//! (reverts, transport errors) pass through unmodified: the SDK never masks
//! or retries a failed monetary mutation.

use std::time::Duration;

use thiserror::Error;

use crate::address::Address;
use crate::provider::ProviderError;

/// Errors surfaced by stream and manager operations.
#[derive(Clone, Debug, Error)]
pub enum StreamError {
    /// Stream creation attempted with a token the manager does not accept.
    #[error("token {token} is not accepted by this stream manager")]
    TokenNotAccepted {
        /// The rejected token address.
        token: Address,
    },

    /// The sender's balance or spend approval cannot cover the deposit.
    #[error("not enough balance or allowance, please approve {manager}")]
    NotEnoughAllowance {
        /// The manager that needs the approval.
        manager: Address,
    },

    /// The funded amount buys less stream life than the contract requires.
    #[error(
        "stream life is {stream_life:?}, expected at least {min_stream_life:?}; \
         increase the funding amount to proceed"
    )]
    StreamLifeInsufficient {
        /// Stream life the proposed funding would buy.
        stream_life: Duration,
        /// Minimum life the contract enforces.
        min_stream_life: Duration,
    },

    /// Validator evaluation produced a non-positive funding rate.
    #[error("no valid products in stream creation")]
    NoValidProducts,

    /// A specific validator rejected the proposed stream.
    #[error("validator {validator} rejected the proposed stream")]
    ValidatorFailed {
        /// The validator that rejected.
        validator: Address,
    },

    /// Early cancellation attempted by someone other than the controller.
    #[error("stream is not cancelable yet ({time_left:?} left)")]
    StreamNotCancellable {
        /// Time remaining on the stream at the point of the attempt.
        time_left: Duration,
    },

    /// Claim attempted with a zero claimable balance.
    #[error("stream has no funds left to claim")]
    FundsNotClaimable,

    /// The stream was built from bare identifiers and its creation
    /// transaction cannot be recovered.
    #[error("stream carries no creation receipt or transaction hash")]
    MissingCreationReceipt,

    /// A duration expression used an unrecognized time unit.
    #[error("unknown time unit {unit:?}")]
    InvalidTimeUnit {
        /// The unit text that failed to parse.
        unit: String,
    },

    /// A rate expression resolved to zero tokens per second.
    #[error("rate {expr:?} resolves to zero tokens per second")]
    InvalidRate {
        /// The offending rate expression.
        expr: String,
    },

    /// More validators than the contract's hard cap were submitted.
    #[error("{count} validators exceeds the contract cap of {max}")]
    TooManyValidators {
        /// Number of validators after deduplication.
        count: usize,
        /// The contract's hard cap.
        max: usize,
    },

    /// No stream manager deployment exists for the queried deployer.
    #[error("no stream manager deployed for {deployer}")]
    ManagerDoesNotExist {
        /// The deployer that was looked up.
        deployer: Address,
    },

    /// A failure from the remote provider layer, passed through unmodified.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_structured_data() {
        let err = StreamError::StreamLifeInsufficient {
            stream_life: Duration::from_secs(60),
            min_stream_life: Duration::from_secs(3600),
        };
        let text = err.to_string();
        assert!(text.contains("60s"));
        assert!(text.contains("3600s"));

        let err = StreamError::TokenNotAccepted {
            token: Address::from_low_u64(5),
        };
        assert!(err.to_string().contains("0x"));
    }
}
