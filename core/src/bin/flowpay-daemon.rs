//! Flowpay Daemon
//!
//! Long-lived watcher over a stream manager: tracks every stream's
//! lifecycle status against the configured thresholds, logs transitions,
//! and auto-claims streams that have run dry. All logic goes through the
//! public SDK operations.
//!
//! # Usage
//!
//! ```bash
//! # Watch the in-memory demo chain (no node required)
//! flowpay-daemon --demo
//!
//! # With verbose logging
//! RUST_LOG=debug flowpay-daemon --demo
//! ```
//!
//! # Environment Variables
//!
//! - `FLOWPAY_MANAGER_ADDRESS`: Stream manager contract address
//! - `FLOWPAY_WARNING_LEVEL` / `FLOWPAY_CRITICAL_LEVEL`: Status thresholds
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! Connecting to a real chain means constructing a `Provider` for it and
//! handing it to [`run`]; the binary itself ships with the in-memory demo
//! chain only.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::time::interval;
use tracing::{error, info, warn};

use flowpay_core::{
    load_config, Address, FlowpayConfig, MockChain, Stream, StreamManager, StreamStatus,
    TxContext, ValidatorBehavior,
};

/// How often stream statuses are re-evaluated.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Build the demo world: a token, one pricing validator, a manager, and a
/// payer with funds and approval.
fn demo_world(chain: &MockChain) -> (StreamManager, Address, Address) {
    let controller = Address::from_low_u64(0xc0);
    let payer = Address::from_low_u64(0xa0);
    let token = chain.deploy_token(6);
    let validator = chain.deploy_validator(ValidatorBehavior::FundingPeriod(3600));
    let manager_address = chain.deploy_manager(
        controller,
        Duration::from_secs(600),
        &[token],
        &[validator],
    );
    chain.mint(token, payer, 100_000_000);
    chain.approve(token, payer, manager_address, u128::MAX);

    (
        StreamManager::new(manager_address, chain.provider()),
        token,
        payer,
    )
}

/// Evaluate one stream, logging status transitions and claiming it once it
/// has run dry with funds still unlocked.
async fn evaluate_stream(
    stream: &Stream,
    statuses: &mut HashMap<u64, StreamStatus>,
    config: &FlowpayConfig,
    claim_ctx: &TxContext,
) {
    let status = match stream
        .status(config.warning_level, config.critical_level)
        .await
    {
        Ok(status) => status,
        Err(err) => {
            error!(stream = stream.id(), %err, "failed to read stream status");
            return;
        }
    };

    let previous = statuses.insert(stream.id(), status);
    if previous != Some(status) {
        match status {
            StreamStatus::Normal => info!(stream = stream.id(), "stream funded normally"),
            StreamStatus::Warning => warn!(stream = stream.id(), "stream running low"),
            StreamStatus::Critical => warn!(stream = stream.id(), "stream about to run dry"),
            StreamStatus::Inactive => info!(stream = stream.id(), "stream inactive"),
        }
    }

    if status != StreamStatus::Inactive {
        return;
    }

    match stream.amount_claimable().await {
        Ok(claimable) if claimable > 0 => {
            info!(stream = stream.id(), claimable, "claiming exhausted stream");
            if let Err(err) = stream.claim(claim_ctx).await {
                error!(stream = stream.id(), %err, "claim failed");
            }
        }
        Ok(_) => {}
        Err(err) => error!(stream = stream.id(), %err, "failed to read claimable"),
    }
}

/// Watch `manager` until shutdown.
async fn run(manager: StreamManager, config: FlowpayConfig) -> anyhow::Result<()> {
    let controller = manager.controller().await?;
    let claim_ctx = TxContext::from_sender(controller);

    let mut watched: HashMap<u64, Stream> = HashMap::new();
    let mut statuses: HashMap<u64, StreamStatus> = HashMap::new();

    // Start from the full historical picture, then follow events.
    for stream in manager.all_streams(None).await? {
        watched.insert(stream.id(), stream);
    }
    info!(count = watched.len(), "watching existing streams");

    let mut created = manager.watch_new_streams(0).await?;
    let mut funded = manager.watch_funded_streams(0).await?;
    let mut cancelled = manager.watch_cancelled_streams(0).await?;

    let mut poll = interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            Some(stream) = created.recv() => {
                info!(stream = stream.id(), "discovered stream");
                watched.insert(stream.id(), stream);
            }
            Some(stream) = funded.recv() => {
                // The event only identifies the stream; live accessors are
                // the source of truth for its new state.
                evaluate_stream(&stream, &mut statuses, &config, &claim_ctx).await;
                watched.entry(stream.id()).or_insert(stream);
            }
            Some(stream) = cancelled.recv() => {
                evaluate_stream(&stream, &mut statuses, &config, &claim_ctx).await;
            }
            _ = poll.tick() => {
                for stream in watched.values() {
                    evaluate_stream(stream, &mut statuses, &config, &claim_ctx).await;
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("flowpay_daemon=info".parse()?)
                .add_directive("flowpay_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let config = load_config().context("loading configuration")?;
    let demo = std::env::args().any(|arg| arg == "--demo");

    if !demo {
        anyhow::bail!(
            "no chain transport is built into this binary; run with --demo, \
             or embed the watcher via the library with your own Provider"
        );
    }

    let chain = MockChain::new();
    let (manager, token, payer) = demo_world(&chain);
    info!(manager = %manager.address(), "demo chain ready");

    // One demo stream, plus a background clock so statuses move.
    let ctx = TxContext::from_sender(payer);
    let stream = manager
        .create(
            token,
            7_200_000u128,
            vec![br#"{"tier": "demo"}"#.to_vec()],
            None,
            &ctx,
        )
        .await
        .context("creating demo stream")?;
    info!(stream = stream.id(), "demo stream created");

    let clock = chain.clone();
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(1));
        loop {
            tick.tick().await;
            clock.advance(Duration::from_secs(120));
        }
    });

    run(manager, config).await
}
