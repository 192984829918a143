//! Stream Entity
//!
//! One funding stream's on-chain state projected into the client. Fields
//! come in two explicit categories:
//!
//! - **immutable-once-set** (`token`, `amount_per_second`, `start_time`,
//!   `products`): fetched once and cached for the life of the handle
//! - **live** (`owner`, `funded_amount`, `last_pull`, everything derived
//!   from them): re-read on every access, because funding, claims, and
//!   cancellation move them between calls
//!
//! Mutations are guarded client-side where a doomed transaction can be
//! predicted without submitting it; contract-level failures that slip past
//! the guards surface unmodified.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::address::{Address, TxHash};
use crate::error::StreamError;
use crate::manager::StreamManager;
use crate::provider::{decode, Call, ProviderError, Receipt, TxContext};
use crate::rate::{self, MAX_STREAM_DURATION};
use crate::reason::StreamReason;
use crate::status::StreamStatus;

/// Snapshot of a stream's on-chain record, as returned by the contract's
/// `streams(id)` view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamInfo {
    /// The payer who created and funds the stream.
    pub owner: Address,
    /// Funding token.
    pub token: Address,
    /// Unlock rate in base token units per second.
    #[serde(with = "crate::address::wire::u128_string")]
    pub amount_per_second: u128,
    /// Current stream balance: deposits not yet claimed or refunded.
    #[serde(with = "crate::address::wire::u128_string")]
    pub funded_amount: u128,
    /// Creation timestamp, seconds.
    pub start_time: u64,
    /// Last accounting checkpoint, seconds.
    pub last_pull: u64,
    /// Opaque product payloads attached at creation.
    #[serde(with = "crate::address::wire::hex_bytes_list")]
    pub products: Vec<Vec<u8>>,
}

/// How a stream handle can prove its creation.
#[derive(Clone, Debug)]
enum Provenance {
    /// Built from bare identifiers; no way back to the creation
    /// transaction.
    None,
    /// Built from a log; the transaction hash can recover the receipt.
    Transaction(TxHash),
    /// Built by `create`; the full receipt is in hand.
    Receipt(Receipt),
}

/// A handle to one stream of a [`StreamManager`].
#[derive(Clone, Debug)]
pub struct Stream {
    manager: StreamManager,
    id: u64,
    provenance: Provenance,
    token: OnceCell<Address>,
    amount_per_second: OnceCell<u128>,
    start_time: OnceCell<DateTime<Utc>>,
    products: OnceCell<Vec<Vec<u8>>>,
}

fn datetime_from_timestamp(seconds: u64) -> DateTime<Utc> {
    // Clamp instead of failing: a corrupt timestamp should not make a
    // read-only accessor unusable.
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Stream {
    /// A stream from bare identifiers.
    ///
    /// The handle works fully, but [`Stream::transaction_created`] will
    /// fail with [`StreamError::MissingCreationReceipt`].
    #[must_use]
    pub fn new(manager: StreamManager, id: u64) -> Self {
        Self::with_provenance(manager, id, Provenance::None)
    }

    /// A stream discovered through a log, carrying its transaction hash.
    #[must_use]
    pub fn from_transaction(manager: StreamManager, id: u64, transaction_hash: TxHash) -> Self {
        Self::with_provenance(manager, id, Provenance::Transaction(transaction_hash))
    }

    /// A stream returned by `create`, carrying the full creation receipt.
    #[must_use]
    pub fn from_receipt(manager: StreamManager, id: u64, receipt: Receipt) -> Self {
        Self::with_provenance(manager, id, Provenance::Receipt(receipt))
    }

    fn with_provenance(manager: StreamManager, id: u64, provenance: Provenance) -> Self {
        Self {
            manager,
            id,
            provenance,
            token: OnceCell::new(),
            amount_per_second: OnceCell::new(),
            start_time: OnceCell::new(),
            products: OnceCell::new(),
        }
    }

    /// The stream's numeric identifier.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The manager this stream belongs to.
    #[must_use]
    pub fn manager(&self) -> &StreamManager {
        &self.manager
    }

    /// The receipt of the transaction that created this stream.
    pub async fn transaction_created(&self) -> Result<Receipt, StreamError> {
        match &self.provenance {
            Provenance::Receipt(receipt) => Ok(receipt.clone()),
            Provenance::Transaction(hash) => {
                Ok(self.manager.provider().get_receipt(*hash).await?)
            }
            Provenance::None => Err(StreamError::MissingCreationReceipt),
        }
    }

    /// Fetch the current on-chain record. Always a fresh read.
    pub async fn info(&self) -> Result<StreamInfo, StreamError> {
        let value = self
            .manager
            .provider()
            .read(Call::new(
                self.manager.address(),
                "streams",
                vec![json!(self.id)],
            ))
            .await?;
        Ok(serde_json::from_value(value)
            .map_err(|e| ProviderError::decode("stream info", e))?)
    }

    /// The funding token. Immutable once set; cached after the first read.
    pub async fn token(&self) -> Result<Address, StreamError> {
        let token = self
            .token
            .get_or_try_init(|| async { self.info().await.map(|info| info.token) })
            .await?;
        Ok(*token)
    }

    /// Unlock rate in base token units per second. Cached after the first
    /// read.
    pub async fn amount_per_second(&self) -> Result<u128, StreamError> {
        let rate = self
            .amount_per_second
            .get_or_try_init(|| async { self.info().await.map(|info| info.amount_per_second) })
            .await?;
        Ok(*rate)
    }

    /// Creation time. Cached after the first read.
    pub async fn start_time(&self) -> Result<DateTime<Utc>, StreamError> {
        let start = self
            .start_time
            .get_or_try_init(|| async {
                self.info()
                    .await
                    .map(|info| datetime_from_timestamp(info.start_time))
            })
            .await?;
        Ok(*start)
    }

    /// Product payloads attached at creation. Cached after the first read.
    pub async fn products(&self) -> Result<Vec<Vec<u8>>, StreamError> {
        let products = self
            .products
            .get_or_try_init(|| async { self.info().await.map(|info| info.products) })
            .await?;
        Ok(products.clone())
    }

    /// The funding purpose, decoded best-effort from the leading product
    /// payload: raw bytes, then UTF-8 text, then JSON. Never fails on
    /// undecodable content.
    pub async fn reason(&self) -> Result<StreamReason, StreamError> {
        let products = self.products().await?;
        Ok(products
            .first()
            .map_or(StreamReason::Empty, |payload| StreamReason::decode(payload)))
    }

    /// The payer who created the stream. Live read.
    pub async fn owner(&self) -> Result<Address, StreamError> {
        Ok(self.info().await?.owner)
    }

    /// Current stream balance. Live read.
    pub async fn funded_amount(&self) -> Result<u128, StreamError> {
        Ok(self.info().await?.funded_amount)
    }

    /// Last accounting checkpoint. Live read.
    pub async fn last_pull(&self) -> Result<DateTime<Utc>, StreamError> {
        Ok(datetime_from_timestamp(self.info().await?.last_pull))
    }

    /// Unlocked balance currently available for withdrawal. Live read,
    /// never above [`StreamInfo::funded_amount`].
    pub async fn amount_claimable(&self) -> Result<u128, StreamError> {
        let value = self
            .manager
            .provider()
            .read(Call::new(
                self.manager.address(),
                "amount_claimable",
                vec![json!(self.id)],
            ))
            .await?;
        Ok(decode::amount(&value, "amount_claimable")?)
    }

    /// The share that would return to the payer on an immediate cancel.
    pub async fn amount_refundable(&self) -> Result<u128, StreamError> {
        let funded = self.info().await?.funded_amount;
        let claimable = self.amount_claimable().await?;
        Ok(funded.saturating_sub(claimable))
    }

    /// Time until the stream runs dry, clamped to
    /// [`MAX_STREAM_DURATION`]. Zero once exhausted or cancelled, and
    /// stays zero.
    pub async fn time_left(&self) -> Result<Duration, StreamError> {
        let value = self
            .manager
            .provider()
            .read(Call::new(
                self.manager.address(),
                "time_left",
                vec![json!(self.id)],
            ))
            .await?;
        let seconds = decode::uint(&value, "time_left")?;
        Ok(Duration::from_secs(seconds).min(MAX_STREAM_DURATION))
    }

    /// Total lifetime of the stream so far plus the life its current
    /// balance still buys.
    pub async fn total_time(&self) -> Result<Duration, StreamError> {
        // One read keeps the arithmetic at a single state height.
        let info = self.info().await?;
        let elapsed = Duration::from_secs(info.last_pull.saturating_sub(info.start_time));
        let remaining = rate::stream_life(info.funded_amount, info.amount_per_second);
        Ok(elapsed.saturating_add(remaining).min(MAX_STREAM_DURATION))
    }

    /// Whether the stream still has time left.
    pub async fn is_active(&self) -> Result<bool, StreamError> {
        Ok(self.time_left().await? > Duration::ZERO)
    }

    /// Whether the payer may cancel right now. The manager's controller
    /// may always cancel; for the payer this turns true once the minimum
    /// stream life has elapsed since the later of creation and the last
    /// funding.
    pub async fn is_cancelable(&self) -> Result<bool, StreamError> {
        let value = self
            .manager
            .provider()
            .read(Call::new(
                self.manager.address(),
                "stream_is_cancelable",
                vec![json!(self.id)],
            ))
            .await?;
        Ok(decode::boolean(&value, "stream_is_cancelable")?)
    }

    /// Lifecycle status against the given thresholds.
    pub async fn status(
        &self,
        warning: Duration,
        critical: Duration,
    ) -> Result<StreamStatus, StreamError> {
        Ok(StreamStatus::from_time_left(
            self.time_left().await?,
            warning,
            critical,
        ))
    }

    /// Unlock rate in human-readable tokens per second.
    pub async fn funding_rate(&self) -> Result<f64, StreamError> {
        let rate = self.amount_per_second().await?;
        let token = self.token().await?;
        let value = self
            .manager
            .provider()
            .read(Call::new(token, "decimals", vec![]))
            .await?;
        let decimals = decode::uint(&value, "decimals")?;
        let decimals = u8::try_from(decimals)
            .map_err(|_| ProviderError::decode("decimals", decimals))?;
        Ok(rate::display_rate(rate, decimals))
    }

    /// Tokens needed to extend this stream by `period`. Exact in base
    /// units.
    pub async fn estimate_funding(&self, period: Duration) -> Result<u128, StreamError> {
        Ok(rate::estimate_funding(period, self.amount_per_second().await?))
    }

    /// Add funds to the stream.
    ///
    /// No client-side guard: topping up is cheap to predict only by
    /// re-reading state, so a stream that has already ended surfaces the
    /// contract's own revert unmodified.
    pub async fn add_funds(&self, amount: u128, ctx: &TxContext) -> Result<Receipt, StreamError> {
        debug!(stream = self.id, amount, "funding stream");
        let receipt = self
            .manager
            .provider()
            .submit(
                Call::new(
                    self.manager.address(),
                    "fund_stream",
                    vec![json!(self.id), json!(amount.to_string())],
                ),
                ctx,
            )
            .await?;
        Ok(receipt)
    }

    /// Cancel the stream, settling unlocked funds and refunding the rest.
    ///
    /// Guarded by [`Stream::is_cancelable`] unless the sender is the
    /// manager's controller, who may cancel at any time.
    pub async fn cancel(
        &self,
        reason: Option<&[u8]>,
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        let is_controller = match ctx.sender {
            Some(sender) => sender == self.manager.controller().await?,
            None => false,
        };
        if !is_controller && !self.is_cancelable().await? {
            return Err(StreamError::StreamNotCancellable {
                time_left: self.time_left().await?,
            });
        }

        let mut args = vec![json!(self.id)];
        if let Some(reason) = reason {
            args.push(json!(format!("0x{}", hex::encode(reason))));
        }

        info!(stream = self.id, "cancelling stream");
        let receipt = self
            .manager
            .provider()
            .submit(
                Call::new(self.manager.address(), "cancel_stream", args),
                ctx,
            )
            .await?;
        Ok(receipt)
    }

    /// Claim the unlocked balance, transferring it out and advancing the
    /// accounting checkpoint.
    ///
    /// Guarded by a non-zero claimable balance; fails with
    /// [`StreamError::FundsNotClaimable`] otherwise.
    pub async fn claim(&self, ctx: &TxContext) -> Result<Receipt, StreamError> {
        if self.amount_claimable().await? == 0 {
            return Err(StreamError::FundsNotClaimable);
        }

        info!(stream = self.id, "claiming stream");
        let receipt = self
            .manager
            .provider()
            .submit(
                Call::new(
                    self.manager.address(),
                    "claim_stream",
                    vec![json!(self.id)],
                ),
                ctx,
            )
            .await?;
        Ok(receipt)
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Stream(manager={}, id={})",
            self.manager.address(),
            self.id
        )
    }
}
