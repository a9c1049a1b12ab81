//! Processing-Phase Processor (confirmation watcher)
//!
//! Checks every in-flight submission against its on-chain receipt. Reads are
//! safe to run concurrently with submission, so this phase never takes an
//! exclusive lock; the phase flag is only consulted as an advisory skip.
//!
//! A receipt counts as mined when it has at least one confirmation, a
//! success status, and produced at least one log entry (a token transfer
//! always emits). Anything else observed on a receipt is a rejection.
//! Receipt-fetch errors are logged and leave the record untouched for the
//! next cycle — this is the one phase allowed to silently retry by doing
//! nothing.

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::RelayContext;
use super::locks::Phase;
use super::machine::{TxEvent, TxState};
use super::store::RecordStore;
use super::types::{PhaseOutcome, RecordPatch, TransferRecord};
use crate::chain::client::SettlementClient;
use crate::relay::error::RelayError;

enum ConfirmStep {
    Mined,
    Rejected,
    Untouched,
}

/// Run the confirmation watcher over a batch of processing records.
pub async fn process_processing(
    ctx: &RelayContext,
    batch: Vec<TransferRecord>,
) -> Result<PhaseOutcome, RelayError> {
    if ctx.locks.is_held(Phase::Processing).await? {
        debug!(lock = %Phase::Processing, "phase lock held, skipping run");
        return Ok(PhaseOutcome::skipped());
    }

    let eligible: Vec<TransferRecord> = batch
        .into_iter()
        .filter(|r| r.machine.matches(TxState::Processing) && r.machine.submit_hash.is_some())
        .collect();

    let steps = join_all(eligible.iter().map(|record| confirm_record(ctx, record))).await;

    let mut outcome = PhaseOutcome::default();
    for step in steps {
        match step? {
            ConfirmStep::Mined => outcome.advanced += 1,
            ConfirmStep::Rejected => outcome.errored += 1,
            ConfirmStep::Untouched => {}
        }
    }
    Ok(outcome)
}

async fn confirm_record(
    ctx: &RelayContext,
    record: &TransferRecord,
) -> Result<ConfirmStep, RelayError> {
    let Some(hash) = record.machine.submit_hash.clone() else {
        return Ok(ConfirmStep::Untouched);
    };

    let receipt = match ctx.chain.receipt(&hash).await {
        Ok(receipt) => receipt,
        Err(err) => {
            // Transient infrastructure failure: no transition, the next
            // cycle re-attempts.
            warn!(tx_id = %record.id, hash = %hash, error = %err, "failed to fetch receipt");
            return Ok(ConfirmStep::Untouched);
        }
    };

    let Some(receipt) = receipt else {
        // Not mined yet; leave the record for a later cycle.
        debug!(tx_id = %record.id, hash = %hash, "receipt not yet available");
        return Ok(ConfirmStep::Untouched);
    };

    if receipt.confirmations >= 1 && receipt.status && receipt.log_count > 0 {
        let next = record.machine.transition(
            &TxEvent::Mined {
                hash: receipt.tx_hash.clone(),
            },
            ctx.cfg.max_retries,
        );
        ctx.store.update(&record.id, RecordPatch::machine(next)).await?;
        info!(
            tx_id = %record.id,
            hash = %receipt.tx_hash,
            block = receipt.block_number,
            "transfer confirmed"
        );
        Ok(ConfirmStep::Mined)
    } else {
        let reason = format!(
            "execution rejected (status={}, confirmations={}, logs={})",
            receipt.status, receipt.confirmations, receipt.log_count
        );
        let next = record
            .machine
            .transition(&TxEvent::Rejected { reason: reason.clone() }, ctx.cfg.max_retries);
        ctx.store.update(&record.id, RecordPatch::machine(next)).await?;
        warn!(tx_id = %record.id, hash = %hash, reason = %reason, "transfer rejected");
        Ok(ConfirmStep::Rejected)
    }
}
