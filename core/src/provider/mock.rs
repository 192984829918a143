//! In-Memory Mock Chain
//!
//! A [`Provider`] backed by an in-memory model of the streaming contracts:
//! token balances and allowances, validator registries, stream accounting,
//! and a log store with live subscriptions. The clock is fully controlled
//! by the caller, which makes time-dependent accounting deterministic in
//! tests, and every mutating submission is counted so tests can assert that
//! client-side checks short-circuited before anything was submitted.
//!
//! The accounting here is the reference semantics the SDK is written
//! against:
//!
//! - `claimable = min(funded_amount, amount_per_second * (now - last_pull))`
//! - `refundable = funded_amount - claimable`
//! - `time_left = max(0, last_pull + funded_amount / amount_per_second - now)`
//! - a claim moves `claimable` out, reduces `funded_amount`, advances
//!   `last_pull`; a cancel settles `claimable` to the controller, refunds
//!   the remainder to the stream owner, and pins `time_left` at zero
//!   forever
//! - the stream owner may cancel once `MIN_STREAM_LIFE` has elapsed since
//!   the later of creation and the last funding; the controller may cancel
//!   at any time

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::address::{Address, TxHash};
use crate::events::{STREAM_CANCELLED, STREAM_CLAIMED, STREAM_CREATED, STREAM_FUNDED};
use crate::manager::MAX_VALIDATORS;
use crate::provider::traits::{Call, Log, Provider, ProviderError, Receipt, TxContext};

/// Genesis timestamp for new mock chains.
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Capacity of subscription channels. Slow consumers lose events beyond
/// this; acceptable for a test double.
const SUBSCRIPTION_BUFFER: usize = 1024;

// ============================================================================
// Contract State
// ============================================================================

/// How a mock validator contract responds to `validate`.
#[derive(Clone, Copy, Debug)]
pub enum ValidatorBehavior {
    /// Price the deposit so it lasts this many seconds: returns
    /// `amount / seconds` (floored).
    FundingPeriod(u64),
    /// Return a fixed per-second rate regardless of the deposit.
    FixedRate(u128),
    /// Revert every evaluation.
    Reject,
}

#[derive(Clone, Debug, Default)]
struct TokenState {
    decimals: u8,
    balances: HashMap<Address, u128>,
    allowances: HashMap<(Address, Address), u128>,
}

#[derive(Clone, Debug)]
struct StreamRecord {
    owner: Address,
    token: Address,
    amount_per_second: u128,
    funded_amount: u128,
    start_time: u64,
    last_pull: u64,
    last_funded: u64,
    products: Vec<Vec<u8>>,
    cancelled: bool,
}

impl StreamRecord {
    fn amount_claimable(&self, now: u64) -> u128 {
        if self.cancelled {
            return 0;
        }
        let elapsed = u128::from(now.saturating_sub(self.last_pull));
        self.funded_amount
            .min(self.amount_per_second.saturating_mul(elapsed))
    }

    fn time_left(&self, now: u64) -> u64 {
        if self.cancelled || self.amount_per_second == 0 {
            return 0;
        }
        let life = self.funded_amount / self.amount_per_second;
        let life = u64::try_from(life).unwrap_or(u64::MAX);
        let exhausted_at = self.last_pull.saturating_add(life);
        exhausted_at.saturating_sub(now)
    }

    fn is_cancelable(&self, now: u64, min_stream_life: u64) -> bool {
        if self.cancelled {
            return false;
        }
        let anchor = self.start_time.max(self.last_funded);
        now >= anchor.saturating_add(min_stream_life)
    }

    fn info_json(&self) -> Value {
        json!({
            "owner": self.owner.to_string(),
            "token": self.token.to_string(),
            "amount_per_second": self.amount_per_second.to_string(),
            "funded_amount": self.funded_amount.to_string(),
            "start_time": self.start_time,
            "last_pull": self.last_pull,
            "products": self.products.iter()
                .map(|p| format!("0x{}", hex::encode(p)))
                .collect::<Vec<_>>(),
        })
    }
}

#[derive(Clone, Debug)]
struct ManagerState {
    controller: Address,
    min_stream_life: u64,
    accepted: Vec<Address>,
    validators: Vec<Address>,
    streams: Vec<StreamRecord>,
}

struct Subscriber {
    contract: Address,
    event: String,
    sender: mpsc::Sender<Log>,
}

#[derive(Default)]
struct ChainState {
    timestamp: u64,
    block: u64,
    next_address: u64,
    next_tx: u64,
    submissions: u64,
    tokens: HashMap<Address, TokenState>,
    validators: HashMap<Address, ValidatorBehavior>,
    managers: HashMap<Address, ManagerState>,
    factories: HashMap<Address, HashMap<Address, Address>>,
    receipts: HashMap<TxHash, Receipt>,
    logs: Vec<Log>,
    subscribers: Vec<Subscriber>,
}

impl ChainState {
    fn fresh_address(&mut self) -> Address {
        self.next_address += 1;
        Address::from_low_u64(0x1000 + self.next_address)
    }

    fn emit(&mut self, contract: Address, event: &str, params: Value, tx: TxHash) -> Log {
        let log = Log {
            contract,
            event: event.to_string(),
            params,
            transaction_hash: tx,
            block_number: self.block,
        };
        self.logs.push(log.clone());
        self.subscribers.retain(|sub| {
            if sub.contract != contract || sub.event != event {
                return true;
            }
            // A closed receiver means the consumer is gone; a full buffer
            // drops the event for that consumer only.
            !matches!(
                sub.sender.try_send(log.clone()),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });
        log
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), ProviderError> {
        let state = self
            .tokens
            .get_mut(&token)
            .ok_or_else(|| revert("unknown token"))?;
        let balance = state.balances.entry(from).or_default();
        if *balance < amount {
            return Err(revert("insufficient balance"));
        }
        *balance -= amount;
        *state.balances.entry(to).or_default() += amount;
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: u128,
    ) -> Result<(), ProviderError> {
        let state = self
            .tokens
            .get_mut(&token)
            .ok_or_else(|| revert("unknown token"))?;
        let allowance = state.allowances.entry((owner, spender)).or_default();
        if *allowance < amount {
            return Err(revert("insufficient allowance"));
        }
        *allowance -= amount;
        Ok(())
    }

    /// Funding rate the manager's validators assign to a proposed stream.
    /// Rejecting validators contribute zero, they do not abort.
    fn funding_rate(&self, manager: &ManagerState, amount: u128, _products: &[Vec<u8>]) -> u128 {
        let mut total: u128 = 0;
        for addr in &manager.validators {
            match self.validators.get(addr) {
                Some(ValidatorBehavior::FundingPeriod(seconds)) if *seconds > 0 => {
                    total = total.saturating_add(amount / u128::from(*seconds));
                }
                Some(ValidatorBehavior::FixedRate(rate)) => {
                    total = total.saturating_add(*rate);
                }
                Some(ValidatorBehavior::Reject | ValidatorBehavior::FundingPeriod(_)) | None => {}
            }
        }
        total
    }
}

fn revert(reason: &str) -> ProviderError {
    ProviderError::Revert {
        reason: reason.to_string(),
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, ProviderError> {
    args.get(index)
        .ok_or_else(|| ProviderError::decode("call args", format!("missing argument {index}")))
}

fn arg_address(args: &[Value], index: usize) -> Result<Address, ProviderError> {
    let value = arg(args, index)?;
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))
}

fn arg_u64(args: &[Value], index: usize) -> Result<u64, ProviderError> {
    let value = arg(args, index)?;
    value
        .as_u64()
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))
}

fn arg_u128(args: &[Value], index: usize) -> Result<u128, ProviderError> {
    let value = arg(args, index)?;
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))
}

fn arg_bytes(args: &[Value], index: usize) -> Result<Vec<u8>, ProviderError> {
    let value = arg(args, index)?;
    value
        .as_str()
        .and_then(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok())
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))
}

fn arg_bytes_list(args: &[Value], index: usize) -> Result<Vec<Vec<u8>>, ProviderError> {
    let value = arg(args, index)?;
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok())
                .ok_or_else(|| ProviderError::decode("call args", format!("bad payload {item}")))
        })
        .collect()
}

fn arg_address_list(args: &[Value], index: usize) -> Result<Vec<Address>, ProviderError> {
    let value = arg(args, index)?;
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::decode("call args", format!("argument {index}: {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ProviderError::decode("call args", format!("bad address {item}")))
        })
        .collect()
}

// ============================================================================
// Chain Handle and Test Harness
// ============================================================================

/// A cheaply clonable handle to an in-memory chain.
#[derive(Clone, Default)]
pub struct MockChain {
    state: Arc<RwLock<ChainState>>,
}

impl MockChain {
    /// A fresh chain at the genesis timestamp.
    #[must_use]
    pub fn new() -> Self {
        let chain = Self::default();
        chain.state.write().timestamp = GENESIS_TIMESTAMP;
        chain
    }

    /// This chain as a shared [`Provider`].
    #[must_use]
    pub fn provider(&self) -> Arc<dyn Provider> {
        Arc::new(self.clone())
    }

    /// Current chain timestamp, seconds.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.state.read().timestamp
    }

    /// Current block number.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.state.read().block
    }

    /// Advance the clock and mine a block.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.write();
        state.timestamp += elapsed.as_secs();
        state.block += 1;
    }

    /// Number of mutating submissions attempted so far, including reverted
    /// ones (a revert still costs the caller fees).
    #[must_use]
    pub fn submission_count(&self) -> u64 {
        self.state.read().submissions
    }

    /// Deploy a token with the given decimal scale.
    pub fn deploy_token(&self, decimals: u8) -> Address {
        let mut state = self.state.write();
        let address = state.fresh_address();
        state.tokens.insert(
            address,
            TokenState {
                decimals,
                ..TokenState::default()
            },
        );
        address
    }

    /// Credit `amount` of `token` to `to`.
    pub fn mint(&self, token: Address, to: Address, amount: u128) {
        let mut state = self.state.write();
        if let Some(t) = state.tokens.get_mut(&token) {
            *t.balances.entry(to).or_default() += amount;
        }
    }

    /// Set `spender`'s allowance over `owner`'s balance of `token`.
    pub fn approve(&self, token: Address, owner: Address, spender: Address, amount: u128) {
        let mut state = self.state.write();
        if let Some(t) = state.tokens.get_mut(&token) {
            t.allowances.insert((owner, spender), amount);
        }
    }

    /// Current balance of `who` in `token`.
    #[must_use]
    pub fn balance_of(&self, token: Address, who: Address) -> u128 {
        self.state
            .read()
            .tokens
            .get(&token)
            .and_then(|t| t.balances.get(&who).copied())
            .unwrap_or_default()
    }

    /// Deploy a validator contract with a scripted behavior.
    pub fn deploy_validator(&self, behavior: ValidatorBehavior) -> Address {
        let mut state = self.state.write();
        let address = state.fresh_address();
        state.validators.insert(address, behavior);
        address
    }

    /// Deploy a stream manager.
    pub fn deploy_manager(
        &self,
        controller: Address,
        min_stream_life: Duration,
        accepted: &[Address],
        validators: &[Address],
    ) -> Address {
        let mut state = self.state.write();
        let address = state.fresh_address();
        state.managers.insert(
            address,
            ManagerState {
                controller,
                min_stream_life: min_stream_life.as_secs(),
                accepted: accepted.to_vec(),
                validators: validators.to_vec(),
                streams: Vec::new(),
            },
        );
        address
    }

    /// Deploy a factory contract with a fixed deployments table.
    pub fn deploy_factory(&self, deployments: &[(Address, Address)]) -> Address {
        let mut state = self.state.write();
        let address = state.fresh_address();
        state
            .factories
            .insert(address, deployments.iter().copied().collect());
        address
    }

    fn read_inner(&self, call: &Call) -> Result<Value, ProviderError> {
        let state = self.state.read();
        let now = state.timestamp;

        if let Some(manager) = state.managers.get(&call.contract) {
            return match call.method.as_str() {
                "streams" => {
                    let id = arg_u64(&call.args, 0)? as usize;
                    let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                    Ok(stream.info_json())
                }
                "amount_claimable" => {
                    let id = arg_u64(&call.args, 0)? as usize;
                    let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                    Ok(json!(stream.amount_claimable(now).to_string()))
                }
                "time_left" => {
                    let id = arg_u64(&call.args, 0)? as usize;
                    let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                    Ok(json!(stream.time_left(now)))
                }
                "stream_is_cancelable" => {
                    let id = arg_u64(&call.args, 0)? as usize;
                    let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                    Ok(json!(stream.is_cancelable(now, manager.min_stream_life)))
                }
                "token_is_accepted" => {
                    let token = arg_address(&call.args, 0)?;
                    Ok(json!(manager.accepted.contains(&token)))
                }
                "MIN_STREAM_LIFE" => Ok(json!(manager.min_stream_life)),
                "controller" => Ok(json!(manager.controller.to_string())),
                "num_streams" => Ok(json!(manager.streams.len() as u64)),
                "validators" => {
                    // Fixed-size on-chain array: out-of-range reads return
                    // no data, which callers treat as end-of-list.
                    let index = arg_u64(&call.args, 0)? as usize;
                    manager.validators.get(index).map_or_else(
                        || {
                            Err(ProviderError::NoData {
                                method: "validators".to_string(),
                            })
                        },
                        |addr| Ok(json!(addr.to_string())),
                    )
                }
                other => Err(revert(&format!("unknown manager method {other}"))),
            };
        }

        if let Some(token) = state.tokens.get(&call.contract) {
            return match call.method.as_str() {
                "decimals" => Ok(json!(token.decimals)),
                "balanceOf" => {
                    let who = arg_address(&call.args, 0)?;
                    let balance = token.balances.get(&who).copied().unwrap_or_default();
                    Ok(json!(balance.to_string()))
                }
                "allowance" => {
                    let owner = arg_address(&call.args, 0)?;
                    let spender = arg_address(&call.args, 1)?;
                    let allowance = token
                        .allowances
                        .get(&(owner, spender))
                        .copied()
                        .unwrap_or_default();
                    Ok(json!(allowance.to_string()))
                }
                other => Err(revert(&format!("unknown token method {other}"))),
            };
        }

        if let Some(deployments) = state.factories.get(&call.contract) {
            return match call.method.as_str() {
                "deployments" => {
                    let deployer = arg_address(&call.args, 0)?;
                    let manager = deployments.get(&deployer).copied().unwrap_or(Address::ZERO);
                    Ok(json!(manager.to_string()))
                }
                other => Err(revert(&format!("unknown factory method {other}"))),
            };
        }

        Err(revert("unknown contract"))
    }

    #[allow(clippy::too_many_lines)]
    fn submit_inner(&self, call: &Call, ctx: &TxContext) -> Result<Receipt, ProviderError> {
        let mut state = self.state.write();
        state.submissions += 1;
        state.block += 1;
        state.next_tx += 1;
        let tx = TxHash::from_low_u64(state.next_tx);
        let now = state.timestamp;
        let block = state.block;

        let sender = ctx.sender.ok_or_else(|| revert("sender required"))?;
        let manager_address = call.contract;

        if !state.managers.contains_key(&manager_address) {
            return Err(revert("unknown contract"));
        }

        let mut logs = Vec::new();

        match call.method.as_str() {
            "create_stream" => {
                let token = arg_address(&call.args, 0)?;
                let amount = arg_u128(&call.args, 1)?;
                let products = arg_bytes_list(&call.args, 2)?;
                let min_life_override = match call.args.get(3) {
                    Some(_) => Some(arg_u64(&call.args, 3)?),
                    None => None,
                };

                let manager = &state.managers[&manager_address];
                if !manager.accepted.contains(&token) {
                    return Err(revert("token not accepted"));
                }

                let min_stream_life = match min_life_override {
                    Some(life) if life < manager.min_stream_life => {
                        return Err(revert("stream life below contract minimum"));
                    }
                    Some(life) => life,
                    None => manager.min_stream_life,
                };

                let amount_per_second = state.funding_rate(manager, amount, &products);
                if amount_per_second == 0 {
                    return Err(revert("no valid products"));
                }

                let life = amount / amount_per_second;
                if life < u128::from(min_stream_life) {
                    return Err(revert("stream life insufficient"));
                }

                state.spend_allowance(token, sender, manager_address, amount)?;
                state.transfer(token, sender, manager_address, amount)?;

                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                let id = manager.streams.len() as u64;
                manager.streams.push(StreamRecord {
                    owner: sender,
                    token,
                    amount_per_second,
                    funded_amount: amount,
                    start_time: now,
                    last_pull: now,
                    last_funded: now,
                    products,
                    cancelled: false,
                });

                logs.push(state.emit(
                    manager_address,
                    STREAM_CREATED,
                    json!({
                        "id": id,
                        "owner": sender.to_string(),
                        "token": token.to_string(),
                        "amount_per_second": amount_per_second.to_string(),
                        "funded_amount": amount.to_string(),
                    }),
                    tx,
                ));
            }

            "fund_stream" => {
                let id = arg_u64(&call.args, 0)? as usize;
                let amount = arg_u128(&call.args, 1)?;

                let manager = &state.managers[&manager_address];
                let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                if stream.cancelled || stream.time_left(now) == 0 {
                    return Err(revert("stream has ended"));
                }
                let token = stream.token;

                state.spend_allowance(token, sender, manager_address, amount)?;
                state.transfer(token, sender, manager_address, amount)?;

                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                let stream = &mut manager.streams[id];
                stream.funded_amount += amount;
                stream.last_funded = now;
                let funded_amount = stream.funded_amount;

                logs.push(state.emit(
                    manager_address,
                    STREAM_FUNDED,
                    json!({
                        "id": id as u64,
                        "funder": sender.to_string(),
                        "amount": amount.to_string(),
                        "funded_amount": funded_amount.to_string(),
                    }),
                    tx,
                ));
            }

            "claim_stream" => {
                let id = arg_u64(&call.args, 0)? as usize;

                let manager = &state.managers[&manager_address];
                let controller = manager.controller;
                let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                let claimable = stream.amount_claimable(now);
                if claimable == 0 {
                    return Err(revert("nothing to claim"));
                }
                let token = stream.token;

                state.transfer(token, manager_address, controller, claimable)?;

                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                let stream = &mut manager.streams[id];
                stream.funded_amount -= claimable;
                stream.last_pull = now;

                logs.push(state.emit(
                    manager_address,
                    STREAM_CLAIMED,
                    json!({"id": id as u64, "amount": claimable.to_string()}),
                    tx,
                ));
            }

            "cancel_stream" => {
                let id = arg_u64(&call.args, 0)? as usize;
                let reason = match call.args.get(1) {
                    Some(_) => arg_bytes(&call.args, 1)?,
                    None => Vec::new(),
                };

                let manager = &state.managers[&manager_address];
                let controller = manager.controller;
                let min_stream_life = manager.min_stream_life;
                let stream = manager.streams.get(id).ok_or_else(|| revert("no such stream"))?;
                if stream.cancelled {
                    return Err(revert("stream already cancelled"));
                }
                if sender != controller {
                    if sender != stream.owner {
                        return Err(revert("not authorized"));
                    }
                    if !stream.is_cancelable(now, min_stream_life) {
                        return Err(revert("stream not cancelable yet"));
                    }
                }

                let token = stream.token;
                let owner = stream.owner;
                let claimable = stream.amount_claimable(now);
                let refund = stream.funded_amount - claimable;

                if claimable > 0 {
                    state.transfer(token, manager_address, controller, claimable)?;
                }
                if refund > 0 {
                    state.transfer(token, manager_address, owner, refund)?;
                }

                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                let stream = &mut manager.streams[id];
                stream.funded_amount = 0;
                stream.last_pull = now;
                stream.cancelled = true;

                logs.push(state.emit(
                    manager_address,
                    STREAM_CANCELLED,
                    json!({
                        "id": id as u64,
                        "reason": format!("0x{}", hex::encode(&reason)),
                    }),
                    tx,
                ));
            }

            "set_validators" => {
                let new_validators = arg_address_list(&call.args, 0)?;
                if new_validators.len() > MAX_VALIDATORS {
                    return Err(revert("too many validators"));
                }
                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                if sender != manager.controller {
                    return Err(revert("not authorized"));
                }
                manager.validators = new_validators;
            }

            "set_token_accepted" => {
                let token = arg_address(&call.args, 0)?;
                let accepted = arg(&call.args, 1)?
                    .as_bool()
                    .ok_or_else(|| ProviderError::decode("call args", "argument 1"))?;
                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                if sender != manager.controller {
                    return Err(revert("not authorized"));
                }
                if accepted {
                    if !manager.accepted.contains(&token) {
                        manager.accepted.push(token);
                    }
                } else {
                    manager.accepted.retain(|t| *t != token);
                }
            }

            "set_controller" => {
                let new_controller = arg_address(&call.args, 0)?;
                let manager = state
                    .managers
                    .get_mut(&manager_address)
                    .expect("checked above");
                if sender != manager.controller {
                    return Err(revert("not authorized"));
                }
                manager.controller = new_controller;
            }

            other => return Err(revert(&format!("unknown manager method {other}"))),
        }

        let receipt = Receipt {
            transaction_hash: tx,
            block_number: block,
            logs,
        };
        state.receipts.insert(tx, receipt.clone());
        Ok(receipt)
    }

    fn simulate_inner(&self, call: &Call, _ctx: &TxContext) -> Result<Value, ProviderError> {
        let state = self.state.read();

        if let Some(behavior) = state.validators.get(&call.contract) {
            return match call.method.as_str() {
                "validate" => {
                    // validate(funder, token, amount, products) -> rate
                    let _funder = arg_address(&call.args, 0)?;
                    let _token = arg_address(&call.args, 1)?;
                    let amount = arg_u128(&call.args, 2)?;
                    let _products = arg_bytes_list(&call.args, 3)?;
                    match behavior {
                        ValidatorBehavior::FundingPeriod(seconds) if *seconds > 0 => {
                            Ok(json!((amount / u128::from(*seconds)).to_string()))
                        }
                        ValidatorBehavior::FundingPeriod(_) => Ok(json!("0")),
                        ValidatorBehavior::FixedRate(rate) => Ok(json!(rate.to_string())),
                        ValidatorBehavior::Reject => Err(revert("validator rejected")),
                    }
                }
                other => Err(revert(&format!("unknown validator method {other}"))),
            };
        }

        Err(revert("unknown contract"))
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

#[async_trait]
impl Provider for MockChain {
    fn name(&self) -> &str {
        "mock"
    }

    async fn read(&self, call: Call) -> Result<Value, ProviderError> {
        self.read_inner(&call)
    }

    async fn submit(&self, call: Call, ctx: &TxContext) -> Result<Receipt, ProviderError> {
        self.submit_inner(&call, ctx)
    }

    fn supports_batching(&self) -> bool {
        true
    }

    async fn submit_batch(
        &self,
        calls: Vec<Call>,
        ctx: &TxContext,
    ) -> Result<Vec<Result<Receipt, ProviderError>>, ProviderError> {
        // All calls land at one state height; each item still fails or
        // succeeds on its own.
        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            results.push(self.submit_inner(call, ctx));
        }
        Ok(results)
    }

    async fn simulate(&self, call: Call, ctx: &TxContext) -> Result<Value, ProviderError> {
        self.simulate_inner(&call, ctx)
    }

    async fn get_logs(
        &self,
        contract: Address,
        event: &str,
        from_block: u64,
    ) -> Result<Vec<Log>, ProviderError> {
        let state = self.state.read();
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.contract == contract && log.event == event && log.block_number >= from_block
            })
            .cloned()
            .collect())
    }

    async fn subscribe(
        &self,
        contract: Address,
        event: &str,
        from_block: u64,
    ) -> Result<mpsc::Receiver<Log>, ProviderError> {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut state = self.state.write();
        for log in state.logs.iter().filter(|log| {
            log.contract == contract && log.event == event && log.block_number >= from_block
        }) {
            // Replay history into the buffer; a subscriber that cares about
            // more than the buffer holds should use get_logs first.
            let _ = sender.try_send(log.clone());
        }
        state.subscribers.push(Subscriber {
            contract,
            event: event.to_string(),
            sender,
        });
        Ok(receiver)
    }

    async fn get_receipt(&self, transaction_hash: TxHash) -> Result<Receipt, ProviderError> {
        self.state
            .read()
            .receipts
            .get(&transaction_hash)
            .cloned()
            .ok_or(ProviderError::UnknownTransaction(transaction_hash))
    }
}
