//! Flowpay Core - Client SDK for On-Chain Payment Streaming
//!
//! This crate is the client-side model of the flowpay streaming contracts:
//! streams continuously unlock funds to a service provider at a fixed
//! per-second rate, gated at creation time by policy validators. The crate
//! reasons about a stream's economic state (unlocked, claimable,
//! refundable, time left) without re-deriving it ad hoc, and enforces
//! every creation-time invariant client-side before a transaction is
//! submitted.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Callers                                │
//! │      CLI tools, bots, the flowpay-daemon watcher              │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │
//! ┌───────────────────────────┼──────────────────────────────────┐
//! │                      FLOWPAY CORE                             │
//! │  ┌────────────────────────┴───────────────────────────────┐  │
//! │  │                    StreamManager                        │  │
//! │  │  ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌────────┐ │  │
//! │  │  │  Stream  │  │ Validator │  │  Status  │  │ Config │ │  │
//! │  │  │  Entity  │  │    Set    │  │  Engine  │  │        │ │  │
//! │  │  └──────────┘  └───────────┘  └──────────┘  └────────┘ │  │
//! │  └────────────────────────┬───────────────────────────────┘  │
//! └───────────────────────────┼──────────────────────────────────┘
//!                             │
//!                      Provider trait
//!                 (read / submit / simulate /
//!                   get_logs / subscribe)
//! ```
//!
//! # Key Types
//!
//! - [`StreamManager`]: handle to a deployed manager; creation protocol,
//!   validator administration, enumeration, event watches, bulk claiming
//! - [`Stream`]: one stream's projected state; computed accessors and
//!   guarded mutations
//! - [`Validator`]: a policy contract consulted at creation time
//! - [`StreamStatus`]: lifecycle status from remaining time
//! - [`Provider`]: the abstract remote contract-call interface
//! - [`MockChain`]: in-memory provider for tests and demos
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//!
//! use flowpay_core::{Amount, MockChain, StreamManager, TxContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Any Provider implementation works here; the mock chain is the
//!     // in-memory one used for tests and demos.
//!     let chain = MockChain::new();
//!     let payer = flowpay_core::Address::from_low_u64(0xa0);
//!     // ... deploy a token, a validator, and a manager on the mock ...
//!     # let manager_address = flowpay_core::Address::ZERO;
//!     # let token = flowpay_core::Address::ZERO;
//!
//!     let manager = StreamManager::new(manager_address, chain.provider());
//!     let ctx = TxContext::from_sender(payer);
//!     let stream = manager
//!         .create(token, Amount::Units(7200), vec![], None, &ctx)
//!         .await?;
//!
//!     println!("time left: {:?}", stream.time_left().await?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`address`]: address and transaction-hash newtypes, wire encodings
//! - [`config`]: TOML + environment configuration (thresholds, minimums)
//! - [`error`]: the domain error taxonomy
//! - [`events`]: typed contract events
//! - [`factory`]: deployment factory lookups
//! - [`manager`]: the stream manager handle
//! - [`provider`]: the remote contract-call abstraction and the mock chain
//! - [`rate`]: funding-rate arithmetic
//! - [`reason`]: tagged decoding of stream purpose payloads
//! - [`status`]: the stream status engine
//! - [`stream`]: the stream entity
//! - [`time_unit`]: duration-shorthand parsing
//! - [`validator`]: validator handles and set canonicalization
//!
//! # No Wire Transport
//!
//! This crate has **zero** dependencies on any specific chain transport.
//! Everything reaches the chain through the [`Provider`] trait; plugging
//! in a JSON-RPC node, a local fork, or the in-memory mock is the
//! integrator's choice.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod manager;
pub mod provider;
pub mod rate;
pub mod reason;
pub mod status;
pub mod stream;
pub mod time_unit;
pub mod validator;

// Re-exports for convenience
pub use address::{Address, TxHash};
pub use config::{default_config_path, load_config, load_config_from_path, FlowpayConfig};
pub use error::StreamError;
pub use events::StreamEvent;
pub use factory::StreamFactory;
pub use manager::{Amount, StreamManager, MAX_VALIDATORS};
pub use provider::mock::{MockChain, ValidatorBehavior};
pub use provider::{Call, Log, Provider, ProviderError, Receipt, TxContext};
pub use rate::MAX_STREAM_DURATION;
pub use reason::StreamReason;
pub use status::StreamStatus;
pub use stream::{Stream, StreamInfo};
pub use time_unit::{parse_rate, TimeUnit};
pub use validator::{Validator, ValidatorRef};
