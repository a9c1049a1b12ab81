//! Pending-Phase Processor
//!
//! Submits every pending record as a signed meta-transaction, in strict
//! `(sender, nonce)` order. The forwarder nonce for a sender is fetched once
//! when the loop reaches that sender and advanced locally per submission;
//! re-fetching per record would race the network and produce nonce-gap
//! rejections.
//!
//! Per-record failures map to the `errored` event and the loop continues
//! with the next record. A store failure aborts the remaining loop; the
//! phase lock is released on every exit path.
//!
//! Throughput note: one confirmation is awaited per record before the next
//! submission. Custodial signer nonces are not safe to reorder, so this
//! phase deliberately trades throughput for ordering correctness.

use tracing::{debug, error, info, warn};

use super::RelayContext;
use super::locks::Phase;
use super::machine::{TxEvent, TxState};
use super::store::RecordStore;
use super::types::{PhaseOutcome, RecordPatch, TransferRecord};
use crate::chain::client::{ForwardRequest, SettlementClient, WaitOutcome};
use crate::chain::signer::ChildSigner;
use crate::relay::error::RelayError;

/// Running signer context for the submission fold: the current sender's
/// derived key and its next expected forwarder nonce. Threaded explicitly
/// through the loop so the processor carries no hidden mutable state.
struct SignerCursor {
    sender_key: String,
    signer: ChildSigner,
    address: String,
    next_nonce: u64,
}

/// Run the pending phase over a batch. Skips entirely (without touching any
/// record) when the phase lock is held by a concurrent run.
pub async fn process_pending(
    ctx: &RelayContext,
    batch: Vec<TransferRecord>,
) -> Result<PhaseOutcome, RelayError> {
    if !ctx.locks.try_acquire(Phase::Pending).await? {
        debug!(lock = %Phase::Pending, "phase lock held, skipping run");
        return Ok(PhaseOutcome::skipped());
    }

    let result = drive_pending(ctx, batch).await;

    // Released on success and on top-level failure alike.
    ctx.locks.release(Phase::Pending).await?;
    result
}

async fn drive_pending(
    ctx: &RelayContext,
    batch: Vec<TransferRecord>,
) -> Result<PhaseOutcome, RelayError> {
    let mut records: Vec<TransferRecord> = batch
        .into_iter()
        .filter(|r| r.machine.matches(TxState::Pending))
        .collect();
    records.sort_by(|a, b| (a.sender.key(), a.nonce).cmp(&(b.sender.key(), b.nonce)));

    let mut outcome = PhaseOutcome::default();
    let mut cursor: Option<SignerCursor> = None;

    for record in &records {
        match submit_record(ctx, record, &mut cursor).await {
            Ok(hash) => {
                info!(tx_id = %record.id, hash = %hash, "meta-transaction submitted");
                outcome.advanced += 1;
            }
            Err(err) => {
                let (signer_nonce, signer_address) = cursor
                    .as_ref()
                    .map(|c| (c.next_nonce, c.address.clone()))
                    .unwrap_or((0, String::new()));
                error!(
                    tx_id = %record.id,
                    sender = %record.sender,
                    record_nonce = record.nonce,
                    signer_nonce,
                    signer_address = %signer_address,
                    error = %err,
                    "errored processing pending transfer"
                );
                let next = record
                    .machine
                    .transition(&TxEvent::Errored { reason: err.to_string() }, ctx.cfg.max_retries);
                // A store failure here is a top-level infrastructure error:
                // abort the remaining loop (the lock release still happens).
                ctx.store.update(&record.id, RecordPatch::machine(next)).await?;
                outcome.errored += 1;
            }
        }
    }

    Ok(outcome)
}

/// Submit one record, advancing the signer cursor.
async fn submit_record(
    ctx: &RelayContext,
    record: &TransferRecord,
    cursor: &mut Option<SignerCursor>,
) -> Result<String, RelayError> {
    let sender_key = record.sender.key();

    // Moved to another sender: derive its key and fetch the on-chain nonce
    // once for the whole run of this sender's records.
    if cursor.as_ref().map(|c| c.sender_key.as_str()) != Some(sender_key.as_str()) {
        let signer = ctx.signer.signer_for(&record.sender);
        let address = signer.address();
        let next_nonce = ctx.chain.forwarder_nonce(&address).await?;
        debug!(
            sender = %record.sender,
            signer_address = %address,
            forwarder_nonce = next_nonce,
            "signer cursor advanced"
        );
        *cursor = Some(SignerCursor {
            sender_key,
            signer,
            address,
            next_nonce,
        });
    }
    let Some(cur) = cursor.as_mut() else {
        return Err(RelayError::System("signer cursor missing".to_string()));
    };

    let gas = ctx
        .chain
        .estimate_gas(&cur.address, &record.call_target, &record.encoded_call)
        .await?;
    let gas_price = ctx.chain.gas_price().await?;
    let boosted = gas_price * ctx.cfg.gas_premium_percent as u128 / 100;

    let request = ForwardRequest {
        from: cur.address.clone(),
        to: record.call_target.clone(),
        value: 0,
        gas,
        nonce: cur.next_nonce,
        data: record.encoded_call.clone(),
    };
    let signed = cur.signer.sign_forward(request, ctx.chain.chain_id());

    let hash = ctx.chain.submit(&signed, boosted, gas).await?;
    cur.next_nonce += 1;

    let next = record.machine.transition(
        &TxEvent::Submitted { hash: hash.clone() },
        ctx.cfg.max_retries,
    );
    ctx.store
        .update(
            &record.id,
            RecordPatch::submitted(next, chrono::Utc::now().timestamp_millis()),
        )
        .await?;

    // Wait for one confirmation before the next record. A wait that times
    // out or errors leaves the record in processing; the confirmation
    // watcher owns it from here.
    match ctx.chain.wait(&hash, ctx.cfg.confirmations).await {
        Ok(WaitOutcome::Confirmed(receipt)) => {
            debug!(tx_id = %record.id, block = receipt.block_number, "submission confirmed");
        }
        Ok(WaitOutcome::RetryLater) => {
            debug!(tx_id = %record.id, hash = %hash, "confirmation deferred to watcher");
        }
        Err(err) => {
            warn!(tx_id = %record.id, hash = %hash, error = %err, "wait failed after submission");
        }
    }

    Ok(hash)
}
