//! Creation-protocol scenarios.
//!
//! The creation checks run client-side in a load-bearing order so that a
//! transaction doomed to revert is never submitted. Every rejection case
//! here asserts that zero mutating calls reached the chain.

mod common;

use std::time::Duration;

use common::{World, MIN_STREAM_LIFE};
use flowpay_core::{
    Address, StreamError, StreamFactory, StreamManager, ValidatorBehavior,
};

#[tokio::test]
async fn token_not_accepted_short_circuits() {
    let world = World::hourly();
    world.fund_payer(10_000);
    let unlisted = Address::from_low_u64(0xdead);

    let err = world
        .manager
        .create(unlisted, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StreamError::TokenNotAccepted { token } if token == unlisted
    ));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn allowance_checked_before_submission() {
    let world = World::hourly();
    world.chain.mint(world.token, world.payer, 10_000);
    world
        .chain
        .approve(world.token, world.payer, world.manager.address(), 100);

    let err = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::NotEnoughAllowance { .. }));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn balance_checked_before_submission() {
    let world = World::hourly();
    // Unlimited approval, but only 100 units of balance.
    world.chain.mint(world.token, world.payer, 100);
    world
        .chain
        .approve(world.token, world.payer, world.manager.address(), u128::MAX);

    let err = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::NotEnoughAllowance { .. }));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn stream_life_checked_before_submission() {
    // A fixed 2/s rate prices 3600 units at 1800s of life, below the
    // 3600s floor.
    let world = World::with_validators(&[ValidatorBehavior::FixedRate(2)]);
    world.fund_payer(10_000);

    let err = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StreamError::StreamLifeInsufficient { stream_life, min_stream_life }
            if stream_life == Duration::from_secs(1800)
                && min_stream_life == MIN_STREAM_LIFE
    ));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn no_valid_products_when_rate_is_zero() {
    let world = World::with_validators(&[ValidatorBehavior::Reject]);
    world.fund_payer(10_000);

    let err = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::NoValidProducts));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn explicit_min_life_below_floor_rejected() {
    let world = World::hourly();
    world.fund_payer(10_000);

    let err = world
        .manager
        .create(
            world.token,
            3600u128,
            vec![],
            Some(Duration::from_secs(600)),
            &world.payer_ctx(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StreamError::StreamLifeInsufficient { stream_life, min_stream_life }
            if stream_life == Duration::from_secs(600)
                && min_stream_life == MIN_STREAM_LIFE
    ));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn explicit_min_life_above_floor_is_enforced() {
    let world = World::with_validators(&[ValidatorBehavior::FixedRate(1)]);
    world.fund_payer(100_000);
    let two_hours = Duration::from_secs(7200);

    // 3600 units at 1/s buys one hour, short of the requested two.
    let err = world
        .manager
        .create(
            world.token,
            3600u128,
            vec![],
            Some(two_hours),
            &world.payer_ctx(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::StreamLifeInsufficient { .. }));
    assert_eq!(world.chain.submission_count(), 0);

    // 7200 units buys exactly the requested window (non-strict floor).
    let stream = world
        .manager
        .create(
            world.token,
            7200u128,
            vec![],
            Some(two_hours),
            &world.payer_ctx(),
        )
        .await
        .unwrap();
    assert_eq!(stream.time_left().await.unwrap(), two_hours);
}

#[tokio::test]
async fn minimum_life_scenario() {
    // Balance of 3600 units at 1 unit/s against a 3600s floor: creation
    // succeeds with exactly one hour of life.
    let world = World::hourly();
    world.fund_payer(3600);

    let stream = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    assert_eq!(stream.amount_per_second().await.unwrap(), 1);
    assert_eq!(
        stream.time_left().await.unwrap(),
        Duration::from_secs(3600)
    );

    // Topping up by the same amount doubles the remaining window.
    world.fund_payer(3600);
    stream.add_funds(3600, &world.payer_ctx()).await.unwrap();
    assert_eq!(
        stream.time_left().await.unwrap(),
        Duration::from_secs(7200)
    );
}

#[tokio::test]
async fn rate_expression_sizes_the_deposit() {
    let world = World::hourly();
    world.fund_payer(7200);

    // "2/second" over the 3600s minimum life: a 7200-unit deposit.
    let stream = world
        .manager
        .create(world.token, "2/second", vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    assert_eq!(stream.amount_per_second().await.unwrap(), 2);
    assert_eq!(stream.funded_amount().await.unwrap(), 7200);
}

#[tokio::test]
async fn rate_expression_flooring_to_zero_rejected() {
    let world = World::hourly();
    world.fund_payer(10_000);

    let err = world
        .manager
        .create(world.token, "100/hour", vec![], None, &world.payer_ctx())
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::InvalidRate { .. }));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn unknown_time_unit_rejected() {
    let world = World::hourly();
    world.fund_payer(10_000);

    let err = world
        .manager
        .create(
            world.token,
            "100/fortnight",
            vec![],
            None,
            &world.payer_ctx(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StreamError::InvalidTimeUnit { .. }));
    assert_eq!(world.chain.submission_count(), 0);
}

#[tokio::test]
async fn creation_provenance_is_carried() {
    let world = World::hourly();
    world.fund_payer(3600);

    let created = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Created in-band: the receipt is in hand.
    let receipt = created.transaction_created().await.unwrap();
    assert_eq!(receipt.logs.len(), 1);

    // Rebuilt from the event log: the hash recovers the receipt.
    let discovered = world.manager.all_streams(None).await.unwrap();
    let replayed = discovered[0].transaction_created().await.unwrap();
    assert_eq!(replayed.transaction_hash, receipt.transaction_hash);

    // Bare identifiers carry nothing.
    let bare = world.manager.stream(created.id());
    assert!(matches!(
        bare.transaction_created().await.unwrap_err(),
        StreamError::MissingCreationReceipt
    ));
}

#[tokio::test]
async fn factory_resolves_deployments() {
    let world = World::hourly();
    let deployer = Address::from_low_u64(0xbeef);
    let factory_address = world
        .chain
        .deploy_factory(&[(deployer, world.manager.address())]);
    let factory = StreamFactory::new(factory_address, world.chain.provider());

    let resolved: StreamManager = factory.get_deployment(deployer).await.unwrap();
    assert_eq!(resolved.address(), world.manager.address());

    let unknown = Address::from_low_u64(0x1234_5678);
    assert!(matches!(
        factory.get_deployment(unknown).await.unwrap_err(),
        StreamError::ManagerDoesNotExist { deployer } if deployer == unknown
    ));
}

#[tokio::test]
async fn min_stream_life_is_cached() {
    let world = World::hourly();
    assert_eq!(world.manager.min_stream_life().await.unwrap(), MIN_STREAM_LIFE);
    // Second read serves from cache; still the same value.
    assert_eq!(world.manager.min_stream_life().await.unwrap(), MIN_STREAM_LIFE);
}
