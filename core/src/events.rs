//! Contract Events
//!
//! Typed projection of the stream manager's log stream. Event payloads are
//! a discovery signal only; the stream entity's live accessors are the
//! source of truth for current state, since events from distinct types may
//! arrive out of order.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::provider::{Log, ProviderError};

/// Name of the stream-creation event.
pub const STREAM_CREATED: &str = "StreamCreated";
/// Name of the stream-funding event.
pub const STREAM_FUNDED: &str = "StreamFunded";
/// Name of the claim event.
pub const STREAM_CLAIMED: &str = "Claimed";
/// Name of the cancellation event.
pub const STREAM_CANCELLED: &str = "StreamCancelled";

/// A decoded stream manager event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A stream was created. The authoritative creation signal.
    Created {
        /// Stream identifier.
        id: u64,
        /// The payer who created and funds the stream.
        owner: Address,
        /// Funding token.
        token: Address,
        /// Unlock rate in base token units per second.
        #[serde(with = "crate::address::wire::u128_string")]
        amount_per_second: u128,
        /// Initial deposit.
        #[serde(with = "crate::address::wire::u128_string")]
        funded_amount: u128,
    },
    /// An existing stream received more funds.
    Funded {
        /// Stream identifier.
        id: u64,
        /// Account that supplied the funds.
        funder: Address,
        /// Amount added.
        #[serde(with = "crate::address::wire::u128_string")]
        amount: u128,
        /// Stream balance after the deposit.
        #[serde(with = "crate::address::wire::u128_string")]
        funded_amount: u128,
    },
    /// Unlocked funds were claimed.
    Claimed {
        /// Stream identifier.
        id: u64,
        /// Amount transferred out.
        #[serde(with = "crate::address::wire::u128_string")]
        amount: u128,
    },
    /// The stream was cancelled.
    Cancelled {
        /// Stream identifier.
        id: u64,
        /// Optional cancellation payload.
        #[serde(with = "crate::address::wire::hex_bytes")]
        reason: Vec<u8>,
    },
}

impl StreamEvent {
    /// Decode a provider log into a typed event.
    pub fn decode(log: &Log) -> Result<Self, ProviderError> {
        #[derive(Deserialize)]
        struct CreatedParams {
            id: u64,
            owner: Address,
            token: Address,
            #[serde(with = "crate::address::wire::u128_string")]
            amount_per_second: u128,
            #[serde(with = "crate::address::wire::u128_string")]
            funded_amount: u128,
        }

        #[derive(Deserialize)]
        struct FundedParams {
            id: u64,
            funder: Address,
            #[serde(with = "crate::address::wire::u128_string")]
            amount: u128,
            #[serde(with = "crate::address::wire::u128_string")]
            funded_amount: u128,
        }

        #[derive(Deserialize)]
        struct ClaimedParams {
            id: u64,
            #[serde(with = "crate::address::wire::u128_string")]
            amount: u128,
        }

        #[derive(Deserialize)]
        struct CancelledParams {
            id: u64,
            #[serde(with = "crate::address::wire::hex_bytes")]
            reason: Vec<u8>,
        }

        let params = log.params.clone();
        let context = format!("{} log params", log.event);
        match log.event.as_str() {
            STREAM_CREATED => {
                let p: CreatedParams = serde_json::from_value(params)
                    .map_err(|e| ProviderError::decode(context, e))?;
                Ok(Self::Created {
                    id: p.id,
                    owner: p.owner,
                    token: p.token,
                    amount_per_second: p.amount_per_second,
                    funded_amount: p.funded_amount,
                })
            }
            STREAM_FUNDED => {
                let p: FundedParams = serde_json::from_value(params)
                    .map_err(|e| ProviderError::decode(context, e))?;
                Ok(Self::Funded {
                    id: p.id,
                    funder: p.funder,
                    amount: p.amount,
                    funded_amount: p.funded_amount,
                })
            }
            STREAM_CLAIMED => {
                let p: ClaimedParams = serde_json::from_value(params)
                    .map_err(|e| ProviderError::decode(context, e))?;
                Ok(Self::Claimed {
                    id: p.id,
                    amount: p.amount,
                })
            }
            STREAM_CANCELLED => {
                let p: CancelledParams = serde_json::from_value(params)
                    .map_err(|e| ProviderError::decode(context, e))?;
                Ok(Self::Cancelled {
                    id: p.id,
                    reason: p.reason,
                })
            }
            other => Err(ProviderError::decode(
                "stream event",
                format!("unknown event {other:?}"),
            )),
        }
    }

    /// The stream this event concerns.
    #[must_use]
    pub fn stream_id(&self) -> u64 {
        match self {
            Self::Created { id, .. }
            | Self::Funded { id, .. }
            | Self::Claimed { id, .. }
            | Self::Cancelled { id, .. } => *id,
        }
    }
}
