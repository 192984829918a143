//! Stream Manager
//!
//! The entry point of the SDK: a handle bound to a deployed stream manager
//! contract. It owns the creation protocol (client-side checks first, so a
//! transaction doomed to revert is never submitted and never costs fees),
//! validator-set administration, stream enumeration, event-driven
//! discovery, and bulk claiming.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::error::StreamError;
use crate::events::{
    StreamEvent, STREAM_CANCELLED, STREAM_CLAIMED, STREAM_CREATED, STREAM_FUNDED,
};
use crate::provider::{decode, Call, Provider, ProviderError, Receipt, TxContext};
use crate::rate;
use crate::stream::Stream;
use crate::validator::{canonicalize, Validator, ValidatorRef};

/// Hard contract cap on validators per manager. The client never submits
/// more.
pub const MAX_VALIDATORS: usize = 20;

/// Funding for a new stream.
#[derive(Clone, Debug)]
pub enum Amount {
    /// Deposit this many base token units up front.
    Units(u128),
    /// A `"<amount>/<unit>"` rate expression; the deposit is sized to
    /// cover the effective minimum stream life at that rate.
    Rate(String),
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self::Units(units)
    }
}

impl From<&str> for Amount {
    fn from(expr: &str) -> Self {
        Self::Rate(expr.to_string())
    }
}

struct Inner {
    address: Address,
    provider: Arc<dyn Provider>,
    // Immutable contract parameter, read once.
    min_stream_life: OnceCell<Duration>,
}

/// A handle to a deployed stream manager contract. Cheap to clone; all
/// clones share the immutable-parameter cache.
#[derive(Clone)]
pub struct StreamManager {
    inner: Arc<Inner>,
}

impl StreamManager {
    /// Bind to a deployed manager through a provider.
    #[must_use]
    pub fn new(address: Address, provider: Arc<dyn Provider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                address,
                provider,
                min_stream_life: OnceCell::new(),
            }),
        }
    }

    /// The manager's contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.inner.address
    }

    /// The provider this manager talks through.
    #[must_use]
    pub fn provider(&self) -> &dyn Provider {
        self.inner.provider.as_ref()
    }

    async fn read(&self, method: &str, args: Vec<Value>) -> Result<Value, ProviderError> {
        self.inner
            .provider
            .read(Call::new(self.inner.address, method, args))
            .await
    }

    async fn submit(
        &self,
        method: &str,
        args: Vec<Value>,
        ctx: &TxContext,
    ) -> Result<Receipt, ProviderError> {
        self.inner
            .provider
            .submit(Call::new(self.inner.address, method, args), ctx)
            .await
    }

    /// The account administering this manager.
    pub async fn controller(&self) -> Result<Address, StreamError> {
        let value = self.read("controller", vec![]).await?;
        Ok(decode::address(&value, "controller")?)
    }

    /// Hand the manager to a new controller.
    pub async fn set_controller(
        &self,
        new_controller: Address,
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        Ok(self
            .submit(
                "set_controller",
                vec![json!(new_controller.to_string())],
                ctx,
            )
            .await?)
    }

    /// Whether the manager accepts `token` for new streams.
    pub async fn is_accepted(&self, token: Address) -> Result<bool, StreamError> {
        let value = self
            .read("token_is_accepted", vec![json!(token.to_string())])
            .await?;
        Ok(decode::boolean(&value, "token_is_accepted")?)
    }

    /// Add a token to the accepted set.
    pub async fn add_token(&self, token: Address, ctx: &TxContext) -> Result<Receipt, StreamError> {
        Ok(self
            .submit(
                "set_token_accepted",
                vec![json!(token.to_string()), json!(true)],
                ctx,
            )
            .await?)
    }

    /// Remove a token from the accepted set.
    pub async fn remove_token(
        &self,
        token: Address,
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        Ok(self
            .submit(
                "set_token_accepted",
                vec![json!(token.to_string()), json!(false)],
                ctx,
            )
            .await?)
    }

    /// The contract's minimum stream life. Immutable; read once, then
    /// served from cache.
    pub async fn min_stream_life(&self) -> Result<Duration, StreamError> {
        let life = self
            .inner
            .min_stream_life
            .get_or_try_init(|| async {
                let value = self.read("MIN_STREAM_LIFE", vec![]).await?;
                decode::uint(&value, "MIN_STREAM_LIFE").map(Duration::from_secs)
            })
            .await?;
        Ok(*life)
    }

    /// The current validator set, in contract order.
    ///
    /// The on-chain array is fixed-size; probing stops at the first
    /// "no data" response, which signals end-of-list rather than failure.
    pub async fn validators(&self) -> Result<Vec<Validator>, StreamError> {
        let mut validators = Vec::new();
        for index in 0..MAX_VALIDATORS {
            match self.read("validators", vec![json!(index as u64)]).await {
                Ok(value) => {
                    let address = decode::address(&value, "validators")?;
                    validators.push(Validator::new(address, self.clone()));
                }
                Err(ProviderError::NoData { .. }) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(validators)
    }

    /// Replace the validator set wholesale.
    ///
    /// The new set is sorted and deduplicated by address before writing,
    /// and the change is logged as a human-readable diff.
    pub async fn set_validators(
        &self,
        validators: &[ValidatorRef],
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        let new = canonicalize(validators);
        if new.len() > MAX_VALIDATORS {
            return Err(StreamError::TooManyValidators {
                count: new.len(),
                max: MAX_VALIDATORS,
            });
        }

        let mut current: Vec<Address> = self
            .validators()
            .await?
            .iter()
            .map(Validator::address)
            .collect();
        current.sort_unstable();

        info!(manager = %self.inner.address, "validators update:");
        for line in diff_lines(&current, &new) {
            info!("{line}");
        }

        let addresses: Vec<String> = new.iter().map(ToString::to_string).collect();
        Ok(self
            .submit("set_validators", vec![Value::from(addresses)], ctx)
            .await?)
    }

    /// Add validators to the current set.
    pub async fn add_validators(
        &self,
        new_validators: &[ValidatorRef],
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        let mut refs: Vec<ValidatorRef> = self
            .validators()
            .await?
            .into_iter()
            .map(ValidatorRef::from)
            .collect();
        refs.extend_from_slice(new_validators);
        self.set_validators(&refs, ctx).await
    }

    /// Remove validators from the current set.
    pub async fn remove_validators(
        &self,
        old_validators: &[ValidatorRef],
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        let removed: Vec<Address> = old_validators.iter().map(ValidatorRef::address).collect();
        let refs: Vec<ValidatorRef> = self
            .validators()
            .await?
            .into_iter()
            .filter(|v| !removed.contains(&v.address()))
            .map(ValidatorRef::from)
            .collect();
        self.set_validators(&refs, ctx).await
    }

    /// Swap one validator for another in a single write.
    pub async fn replace_validator(
        &self,
        old_validator: impl Into<ValidatorRef>,
        new_validator: impl Into<ValidatorRef>,
        ctx: &TxContext,
    ) -> Result<Receipt, StreamError> {
        let old_address = old_validator.into().address();
        let mut refs: Vec<ValidatorRef> = self
            .validators()
            .await?
            .into_iter()
            .filter(|v| v.address() != old_address)
            .map(ValidatorRef::from)
            .collect();
        refs.push(new_validator.into());
        self.set_validators(&refs, ctx).await
    }

    /// Funding rate the validator set assigns to a proposed stream.
    ///
    /// A rejecting validator is a skip (zero contribution), not a fatal
    /// error; any other provider failure propagates.
    pub async fn compute_funding_rate(
        &self,
        funder: Address,
        token: Address,
        amount: u128,
        products: &[Vec<u8>],
    ) -> Result<u128, StreamError> {
        let mut total: u128 = 0;
        for validator in self.validators().await? {
            match validator.validate(funder, token, amount, products).await {
                Ok(contribution) => total = total.saturating_add(contribution),
                Err(StreamError::ValidatorFailed { validator }) => {
                    debug!(%validator, "validator rejected, counting zero");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    /// Create a stream.
    ///
    /// Check order is load-bearing: accepted-token, rate parse, allowance,
    /// stream-life. Every check runs client-side before the transaction is
    /// submitted, so a doomed creation never costs the caller fees. The
    /// allowance and stream-life checks need a sender and are skipped when
    /// `ctx.sender` is absent (the contract still enforces them).
    pub async fn create(
        &self,
        token: Address,
        amount: impl Into<Amount>,
        products: Vec<Vec<u8>>,
        min_stream_life: Option<Duration>,
        ctx: &TxContext,
    ) -> Result<Stream, StreamError> {
        if !self.is_accepted(token).await? {
            return Err(StreamError::TokenNotAccepted { token });
        }

        let floor = self.min_stream_life().await?;
        let (min_life, explicit) = match min_stream_life {
            Some(requested) if requested < floor => {
                return Err(StreamError::StreamLifeInsufficient {
                    stream_life: requested,
                    min_stream_life: floor,
                });
            }
            Some(requested) => (requested, true),
            None => (floor, false),
        };

        let amount = match amount.into() {
            Amount::Units(units) => units,
            Amount::Rate(expr) => {
                let per_second = rate::per_second_from_expr(&expr)?;
                per_second.saturating_mul(u128::from(min_life.as_secs()))
            }
        };

        if let Some(sender) = ctx.sender {
            let balance = decode::amount(
                &self
                    .inner
                    .provider
                    .read(Call::new(
                        token,
                        "balanceOf",
                        vec![json!(sender.to_string())],
                    ))
                    .await?,
                "balanceOf",
            )?;
            let allowance = decode::amount(
                &self
                    .inner
                    .provider
                    .read(Call::new(
                        token,
                        "allowance",
                        vec![
                            json!(sender.to_string()),
                            json!(self.inner.address.to_string()),
                        ],
                    ))
                    .await?,
                "allowance",
            )?;
            if balance.min(allowance) < amount {
                return Err(StreamError::NotEnoughAllowance {
                    manager: self.inner.address,
                });
            }

            let amount_per_second = self
                .compute_funding_rate(sender, token, amount, &products)
                .await?;
            if amount_per_second == 0 {
                return Err(StreamError::NoValidProducts);
            }

            let stream_life = rate::stream_life(amount, amount_per_second);
            if stream_life < min_life {
                return Err(StreamError::StreamLifeInsufficient {
                    stream_life,
                    min_stream_life: min_life,
                });
            }
        }

        let products_wire: Vec<String> = products
            .iter()
            .map(|p| format!("0x{}", hex::encode(p)))
            .collect();
        let mut args = vec![
            json!(token.to_string()),
            json!(amount.to_string()),
            Value::from(products_wire),
        ];
        if explicit {
            args.push(json!(min_life.as_secs()));
        }

        let receipt = self.submit("create_stream", args, ctx).await?;

        // A transaction may emit more than one creation event; the most
        // recent one is ours.
        let log = receipt
            .logs
            .iter()
            .rev()
            .find(|log| log.event == STREAM_CREATED && log.contract == self.inner.address)
            .ok_or_else(|| {
                ProviderError::decode("creation receipt", "no StreamCreated log emitted")
            })?;
        let event = StreamEvent::decode(log)?;
        let id = event.stream_id();

        info!(manager = %self.inner.address, stream = id, "stream created");
        Ok(Stream::from_receipt(self.clone(), id, receipt))
    }

    /// A bare stream handle by id, without provenance.
    #[must_use]
    pub fn stream(&self, id: u64) -> Stream {
        Stream::new(self.clone(), id)
    }

    /// All streams ever created, rebuilt from the event log.
    ///
    /// Re-queries on every call; never cached, since contract state can
    /// change between calls.
    pub async fn all_streams(&self, from_block: Option<u64>) -> Result<Vec<Stream>, StreamError> {
        let logs = self
            .inner
            .provider
            .get_logs(self.inner.address, STREAM_CREATED, from_block.unwrap_or(0))
            .await?;
        let mut streams = Vec::with_capacity(logs.len());
        for log in logs {
            let event = StreamEvent::decode(&log)?;
            streams.push(Stream::from_transaction(
                self.clone(),
                event.stream_id(),
                log.transaction_hash,
            ));
        }
        Ok(streams)
    }

    /// Streams that still have time left.
    pub async fn active_streams(&self) -> Result<Vec<Stream>, StreamError> {
        let mut active = Vec::new();
        for stream in self.all_streams(None).await? {
            if stream.is_active().await? {
                active.push(stream);
            }
        }
        Ok(active)
    }

    /// Streams with a non-zero claimable balance, active or not; funds
    /// can remain claimable after a stream has ended.
    pub async fn unclaimed_streams(&self) -> Result<Vec<Stream>, StreamError> {
        let mut unclaimed = Vec::new();
        for stream in self.all_streams(None).await? {
            if stream.amount_claimable().await? > 0 {
                unclaimed.push(stream);
            }
        }
        Ok(unclaimed)
    }

    /// Claim several streams, batching into one atomic submission when the
    /// provider supports it and falling back to sequential submission
    /// otherwise. Each item is independently fallible; partial success is
    /// surfaced per item, never swallowed.
    pub async fn claim_many(
        &self,
        streams: &[Stream],
        ctx: &TxContext,
    ) -> Result<Vec<Result<Receipt, ProviderError>>, StreamError> {
        let calls: Vec<Call> = streams
            .iter()
            .map(|stream| {
                Call::new(self.inner.address, "claim_stream", vec![json!(stream.id())])
            })
            .collect();

        if self.inner.provider.supports_batching() {
            debug!(count = calls.len(), "claiming streams in one batch");
        } else {
            debug!(count = calls.len(), "claiming streams sequentially");
        }
        Ok(self.inner.provider.submit_batch(calls, ctx).await?)
    }

    async fn watch(
        &self,
        event: &'static str,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Stream>, StreamError> {
        let mut logs = self
            .inner
            .provider
            .subscribe(self.inner.address, event, from_block)
            .await?;
        let (sender, receiver) = mpsc::channel(64);
        let manager = self.clone();

        tokio::spawn(async move {
            while let Some(log) = logs.recv().await {
                let decoded = match StreamEvent::decode(&log) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        warn!(%err, event, "skipping undecodable log");
                        continue;
                    }
                };
                // Creation logs carry usable provenance; other events only
                // identify the stream.
                let stream = if event == STREAM_CREATED {
                    Stream::from_transaction(
                        manager.clone(),
                        decoded.stream_id(),
                        log.transaction_hash,
                    )
                } else {
                    Stream::new(manager.clone(), decoded.stream_id())
                };
                if sender.send(stream).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver)
    }

    /// Watch for newly created streams, replaying from `from_block`.
    ///
    /// Dropping the receiver cancels the subscription. Events of distinct
    /// types may race; treat the stream's live accessors as the source of
    /// truth.
    pub async fn watch_new_streams(
        &self,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Stream>, StreamError> {
        self.watch(STREAM_CREATED, from_block).await
    }

    /// Watch for cancelled streams.
    pub async fn watch_cancelled_streams(
        &self,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Stream>, StreamError> {
        self.watch(STREAM_CANCELLED, from_block).await
    }

    /// Watch for streams receiving funds.
    pub async fn watch_funded_streams(
        &self,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Stream>, StreamError> {
        self.watch(STREAM_FUNDED, from_block).await
    }

    /// Watch for claims.
    pub async fn watch_claimed_streams(
        &self,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Stream>, StreamError> {
        self.watch(STREAM_CLAIMED, from_block).await
    }
}

impl std::fmt::Debug for StreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamManager")
            .field("address", &self.inner.address)
            .field("provider", &self.inner.provider.name())
            .finish()
    }
}

impl std::fmt::Display for StreamManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamManager({})", self.inner.address)
    }
}

/// Differ-style lines for a validator-set change: `-` removed, `+` added,
/// two spaces for unchanged. Both inputs must be sorted.
fn diff_lines(old: &[Address], new: &[Address]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut i, mut j) = (0, 0);
    loop {
        match (old.get(i), new.get(j)) {
            (None, None) => break,
            (Some(a), Some(b)) if a == b => {
                lines.push(format!("  {a}"));
                i += 1;
                j += 1;
            }
            (Some(a), Some(b)) if a < b => {
                lines.push(format!("- {a}"));
                i += 1;
            }
            (Some(a), None) => {
                lines.push(format!("- {a}"));
                i += 1;
            }
            (_, Some(b)) => {
                lines.push(format!("+ {b}"));
                j += 1;
            }
        }
    }
    lines
}
