//! Stream accounting and lifecycle scenarios over a controllable clock.

mod common;

use std::time::Duration;

use common::World;
use flowpay_core::{ProviderError, StreamError, StreamReason, StreamStatus};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Accounting invariant: claimable plus refundable always equals the
/// stream's current balance, and claimable never decreases between
/// checkpoints.
#[tokio::test]
async fn claimable_and_refundable_conserve_funding() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    let mut previous_claimable = 0u128;
    for step in [0u64, 1, 100, 1700, 1799, 3600, 10_000] {
        world.chain.advance(Duration::from_secs(step));

        let funded = stream.funded_amount().await.unwrap();
        let claimable = stream.amount_claimable().await.unwrap();
        let refundable = stream.amount_refundable().await.unwrap();

        assert_eq!(claimable + refundable, funded, "after +{step}s");
        assert!(claimable >= previous_claimable, "after +{step}s");
        assert!(claimable <= funded, "after +{step}s");
        previous_claimable = claimable;
    }
}

#[tokio::test]
async fn exhaustion_is_idempotent() {
    let world = World::hourly();
    world.fund_payer(3600);
    let stream = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Exactly at exhaustion.
    world.chain.advance(Duration::from_secs(3600));
    assert_eq!(stream.time_left().await.unwrap(), Duration::ZERO);
    assert!(!stream.is_active().await.unwrap());

    // And indefinitely after.
    world.chain.advance(Duration::from_secs(1_000_000));
    assert_eq!(stream.time_left().await.unwrap(), Duration::ZERO);
    assert!(!stream.is_active().await.unwrap());
    assert_eq!(stream.amount_claimable().await.unwrap(), 3600);
}

#[tokio::test]
async fn funding_an_ended_stream_reverts() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    world.chain.advance(Duration::from_secs(4000));

    // The guard is contract-side; the revert surfaces unmodified.
    let err = stream
        .add_funds(3600, &world.payer_ctx())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::Provider(ProviderError::Revert { .. })
    ));
}

#[tokio::test]
async fn payer_cancel_is_gated_controller_is_not() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Half the minimum life in: the payer must wait.
    world.chain.advance(Duration::from_secs(1800));
    assert!(!stream.is_cancelable().await.unwrap());
    let err = stream
        .cancel(None, &world.payer_ctx())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::StreamNotCancellable { time_left } if time_left > Duration::ZERO
    ));

    // The controller cancels the same stream at the same instant: the
    // unlocked half settles, the rest refunds, and nothing is left.
    stream
        .cancel(Some(b"policy violation".as_slice()), &world.controller_ctx())
        .await
        .unwrap();

    assert_eq!(stream.amount_refundable().await.unwrap(), 0);
    assert_eq!(stream.amount_claimable().await.unwrap(), 0);
    assert_eq!(stream.time_left().await.unwrap(), Duration::ZERO);
    assert!(!stream.is_active().await.unwrap());
    assert_eq!(world.chain.balance_of(world.token, world.controller), 3600);
    assert_eq!(world.chain.balance_of(world.token, world.payer), 3600);
}

#[tokio::test]
async fn payer_can_cancel_after_min_life() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Non-strict boundary: exactly MIN_STREAM_LIFE elapsed.
    world.chain.advance(Duration::from_secs(3600));
    assert!(stream.is_cancelable().await.unwrap());
    stream.cancel(None, &world.payer_ctx()).await.unwrap();
    assert!(!stream.is_active().await.unwrap());
}

#[tokio::test]
async fn topping_up_renews_the_cancel_window() {
    let world = World::hourly();
    world.fund_payer(14_400);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    world.chain.advance(Duration::from_secs(3000));
    stream.add_funds(3600, &world.payer_ctx()).await.unwrap();

    // The funding checkpoint moved; the payer's window restarts.
    world.chain.advance(Duration::from_secs(700));
    assert!(!stream.is_cancelable().await.unwrap());
    world.chain.advance(Duration::from_secs(2900));
    assert!(stream.is_cancelable().await.unwrap());
}

#[tokio::test]
async fn claim_resets_the_counter_and_guards_rerun() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Nothing unlocked yet.
    let err = stream.claim(&world.controller_ctx()).await.unwrap_err();
    assert!(matches!(err, StreamError::FundsNotClaimable));

    world.chain.advance(Duration::from_secs(1000));
    stream.claim(&world.controller_ctx()).await.unwrap();
    assert_eq!(world.chain.balance_of(world.token, world.controller), 2000);
    assert_eq!(stream.amount_claimable().await.unwrap(), 0);
    assert_eq!(stream.funded_amount().await.unwrap(), 5200);

    // The counter accrues again from the new checkpoint.
    world.chain.advance(Duration::from_secs(10));
    assert_eq!(stream.amount_claimable().await.unwrap(), 20);
}

#[tokio::test]
async fn invalid_utf8_reason_returns_raw_bytes() {
    let world = World::hourly();
    world.fund_payer(3600);
    let stream = world
        .manager
        .create(
            world.token,
            3600u128,
            vec![b"\xff\xfe".to_vec()],
            None,
            &world.payer_ctx(),
        )
        .await
        .unwrap();

    assert_eq!(
        stream.reason().await.unwrap(),
        StreamReason::Bytes(vec![0xff, 0xfe])
    );
}

#[tokio::test]
async fn json_reason_decodes_as_document() {
    let world = World::hourly();
    world.fund_payer(3600);
    let stream = world
        .manager
        .create(
            world.token,
            3600u128,
            vec![br#"{"tier": "pro"}"#.to_vec()],
            None,
            &world.payer_ctx(),
        )
        .await
        .unwrap();

    assert_eq!(
        stream.reason().await.unwrap(),
        StreamReason::Json(json!({"tier": "pro"}))
    );
}

#[tokio::test]
async fn funding_estimates_use_exact_base_units() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // 2 units/s; extending by an hour needs exactly 7200 units.
    assert_eq!(
        stream
            .estimate_funding(Duration::from_secs(3600))
            .await
            .unwrap(),
        7200
    );

    // Human-readable rate divides by the token's 6-decimal scale.
    let rate = stream.funding_rate().await.unwrap();
    assert!((rate - 2e-6).abs() < 1e-12);
}

#[tokio::test]
async fn total_time_spans_history_and_remaining_life() {
    let world = World::hourly();
    world.fund_payer(7200);
    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    world.chain.advance(Duration::from_secs(1000));
    stream.claim(&world.controller_ctx()).await.unwrap();

    // 1000s already elapsed plus 2600s the remaining balance buys.
    assert_eq!(
        stream.total_time().await.unwrap(),
        Duration::from_secs(3600)
    );
}

#[tokio::test]
async fn status_follows_the_thresholds() {
    let world = World::hourly();
    world.fund_payer(3600);
    let stream = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    let warning = Duration::from_secs(1800);
    let critical = Duration::from_secs(600);

    assert_eq!(
        stream.status(warning, critical).await.unwrap(),
        StreamStatus::Normal
    );
    world.chain.advance(Duration::from_secs(2000));
    assert_eq!(
        stream.status(warning, critical).await.unwrap(),
        StreamStatus::Warning
    );
    world.chain.advance(Duration::from_secs(1200));
    assert_eq!(
        stream.status(warning, critical).await.unwrap(),
        StreamStatus::Critical
    );
    world.chain.advance(Duration::from_secs(600));
    assert_eq!(
        stream.status(warning, critical).await.unwrap(),
        StreamStatus::Inactive
    );
}

#[tokio::test]
async fn enumeration_requeries_live_state() {
    let world = World::hourly();
    world.fund_payer(14_400);

    let first = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();
    let second = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();
    // Extend the second stream past the first one's horizon.
    second.add_funds(3600, &world.payer_ctx()).await.unwrap();

    assert_eq!(world.manager.all_streams(None).await.unwrap().len(), 2);
    assert_eq!(world.manager.active_streams().await.unwrap().len(), 2);

    // Run the first stream dry: it leaves the active set but stays
    // unclaimed, funds outlive the stream's life.
    world.chain.advance(Duration::from_secs(3600));
    let active = world.manager.active_streams().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_ne!(active[0].id(), first.id());

    let unclaimed = world.manager.unclaimed_streams().await.unwrap();
    assert_eq!(unclaimed.len(), 2);
}

#[tokio::test]
async fn bulk_claim_surfaces_per_item_results() {
    let world = World::hourly();
    world.fund_payer(10_800);

    let wet = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();
    world.chain.advance(Duration::from_secs(600));
    let dry = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // `dry` was just created: nothing unlocked, its claim reverts while
    // the other claim lands.
    let results = world
        .manager
        .claim_many(&[wet.clone(), dry.clone()], &world.controller_ctx())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ProviderError::Revert { .. })));
    assert_eq!(world.chain.balance_of(world.token, world.controller), 1200);
}

#[tokio::test]
async fn watchers_deliver_discovered_streams() {
    let world = World::hourly();
    world.fund_payer(7200);

    let mut created = world.manager.watch_new_streams(0).await.unwrap();
    let mut cancelled = world.manager.watch_cancelled_streams(0).await.unwrap();

    let stream = world
        .manager
        .create(world.token, 7200u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    let discovered = created.recv().await.unwrap();
    assert_eq!(discovered.id(), stream.id());
    // Streams found through creation logs carry provenance.
    assert!(discovered.transaction_created().await.is_ok());

    stream
        .cancel(None, &world.controller_ctx())
        .await
        .unwrap();
    let ended = cancelled.recv().await.unwrap();
    assert_eq!(ended.id(), stream.id());
    assert!(!ended.is_active().await.unwrap());
}

#[tokio::test]
async fn watchers_replay_history_from_start_block() {
    let world = World::hourly();
    world.fund_payer(3600);

    let stream = world
        .manager
        .create(world.token, 3600u128, vec![], None, &world.payer_ctx())
        .await
        .unwrap();

    // Subscribing after the fact still surfaces the stream.
    let mut created = world.manager.watch_new_streams(0).await.unwrap();
    let replayed = created.recv().await.unwrap();
    assert_eq!(replayed.id(), stream.id());
}
