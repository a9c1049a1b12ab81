//! Engine integration tests: full cycles over the in-memory store and the
//! mock settlement network.

use std::sync::Arc;

use super::intake::{IntakeOutcome, IntakeService};
use super::machine::TxState;
use super::reconcile::reconcile;
use super::store::RecordStore;
use super::testutil::{TEST_TOKEN, failed_record, pending_record, test_context};
use super::types::{PartyRef, TransferIntent};
use crate::relay::locks::Phase;

fn intent(jti: &str, user_id: u64, amount: u64) -> TransferIntent {
    TransferIntent {
        jti: jti.to_string(),
        sender: PartyRef::Internal(user_id),
        receiver: PartyRef::external("0xcccccccccccccccccccccccccccccccccccccccc"),
        amount,
    }
}

#[tokio::test]
async fn test_transfer_reaches_success_across_cycles() {
    let (ctx, store, chain) = test_context();
    let intake = IntakeService::new(
        store.clone(),
        ctx.signer.clone(),
        TEST_TOKEN.to_string(),
    );

    intake.create_from_intent(intent("jti-1", 1, 500)).await.unwrap();

    // Cycle 1: pending batch submits; mock chain mines instantly, so the
    // processing batch of cycle 2 confirms.
    reconcile(&ctx).await.unwrap();
    let record = store.get("jti-1").await.unwrap().unwrap();
    assert!(record.machine.matches(TxState::Processing));
    assert_eq!(chain.submitted_count(), 1);

    reconcile(&ctx).await.unwrap();
    let record = store.get("jti-1").await.unwrap().unwrap();
    assert!(record.machine.matches(TxState::Success));
    assert!(record.machine.tx_hash.is_some());
}

#[tokio::test]
async fn test_nonce_set_is_gapless_after_many_intents() {
    let (ctx, store, _chain) = test_context();
    let intake = IntakeService::new(
        store.clone(),
        ctx.signer.clone(),
        TEST_TOKEN.to_string(),
    );

    for i in 0..6 {
        intake
            .create_from_intent(intent(&format!("jti-{}", i), 1, 100))
            .await
            .unwrap();
    }
    // One duplicate sprinkled in; it must not consume a nonce
    let outcome = intake.create_from_intent(intent("jti-3", 1, 100)).await.unwrap();
    assert!(matches!(outcome, IntakeOutcome::Duplicate(_)));

    let mut nonces: Vec<u64> = store
        .for_sender(&PartyRef::Internal(1))
        .await
        .unwrap()
        .iter()
        .map(|r| r.nonce)
        .collect();
    nonces.sort_unstable();
    assert_eq!(nonces, (0..6).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_failed_transfer_retries_then_aborts() {
    let (ctx, store, chain) = test_context();
    let max = ctx.cfg.max_retries;

    // Every submission for forwarder nonce 0 fails; the single record keeps
    // failing, re-queuing, and failing again until the ceiling.
    chain.fail_submit_at(0);
    pending_record(&store, "jti-1", 1, 0).await;

    for _ in 0..(2 * max + 2) {
        reconcile(&ctx).await.unwrap();
        let record = store.get("jti-1").await.unwrap().unwrap();
        if record.machine.matches(TxState::Aborted) {
            break;
        }
    }

    let record = store.get("jti-1").await.unwrap().unwrap();
    assert!(record.machine.matches(TxState::Aborted));
    assert_eq!(record.machine.retries, max);
    assert_eq!(chain.submitted_count(), 0);
}

#[tokio::test]
async fn test_aborted_frontier_freezes_queue_end_to_end() {
    // Scenario C at the driver level: the aborted frontier keeps later
    // pending records from ever reaching the chain.
    let (ctx, store, chain) = test_context();
    failed_record(&store, "jti-0", 1, 0, ctx.cfg.max_retries - 1).await;

    // The last allowed retry pushes the counter to the ceiling; the guard
    // settles the record into aborted instead of re-queuing it.
    reconcile(&ctx).await.unwrap();
    assert!(
        store
            .get("jti-0")
            .await
            .unwrap()
            .unwrap()
            .machine
            .matches(TxState::Aborted)
    );
    pending_record(&store, "jti-1", 1, 1).await;
    pending_record(&store, "jti-2", 1, 2).await;

    let report = reconcile(&ctx).await.unwrap();
    assert_eq!(report.frozen_senders, 1);
    assert_eq!(chain.submitted_count(), 0);
    assert!(
        store
            .get("jti-1")
            .await
            .unwrap()
            .unwrap()
            .machine
            .matches(TxState::Pending)
    );
}

#[tokio::test]
async fn test_overlapping_pending_runs_touch_records_once() {
    let (ctx, store, chain) = test_context();
    let ctx = Arc::new(ctx);
    for i in 0..4 {
        pending_record(&store, &format!("jti-{}", i), 1, i as u64).await;
    }
    let batch = store.unresolved().await.unwrap();

    // Invocation one is mid-run and holds the phase lock; an overlapping
    // invocation must observe it and perform zero writes.
    assert!(ctx.locks.try_acquire(Phase::Pending).await.unwrap());
    let overlapping = super::pending::process_pending(&ctx, batch.clone())
        .await
        .unwrap();
    assert!(overlapping.skipped);
    assert_eq!(chain.submitted_count(), 0);
    for record in store.unresolved().await.unwrap() {
        assert!(record.machine.matches(TxState::Pending));
    }

    // Once the holder finishes, the batch is processed exactly once.
    ctx.locks.release(Phase::Pending).await.unwrap();
    let run = super::pending::process_pending(&ctx, batch).await.unwrap();
    assert_eq!(run.advanced, 4);
    assert_eq!(chain.submitted_count(), 4);
    assert!(!ctx.locks.is_held(Phase::Pending).await.unwrap());
}
