//! Failed-Phase Processor (retry driver)
//!
//! Re-queues failed records below the retry ceiling by emitting `adjusted`.
//! Records already at the ceiling are not eligible here — the machine's
//! automatic guard moved them to `aborted` the moment they settled, and the
//! eligibility filter excludes them regardless.

use tracing::{debug, info};

use super::RelayContext;
use super::locks::Phase;
use super::machine::{TxEvent, TxState};
use super::store::RecordStore;
use super::types::{PhaseOutcome, RecordPatch, TransferRecord};
use crate::relay::error::RelayError;

/// Run the retry driver over a batch of failed records.
pub async fn process_failed(
    ctx: &RelayContext,
    batch: Vec<TransferRecord>,
) -> Result<PhaseOutcome, RelayError> {
    if !ctx.locks.try_acquire(Phase::Failed).await? {
        debug!(lock = %Phase::Failed, "phase lock held, skipping run");
        return Ok(PhaseOutcome::skipped());
    }

    let result = drive_failed(ctx, batch).await;
    ctx.locks.release(Phase::Failed).await?;
    result
}

async fn drive_failed(
    ctx: &RelayContext,
    batch: Vec<TransferRecord>,
) -> Result<PhaseOutcome, RelayError> {
    let mut outcome = PhaseOutcome::default();

    for record in batch {
        if !record.machine.matches(TxState::Failed)
            || record.machine.retries >= ctx.cfg.max_retries
        {
            continue;
        }

        let next = record
            .machine
            .transition(&TxEvent::Adjusted, ctx.cfg.max_retries);
        ctx.store.update(&record.id, RecordPatch::machine(next.clone())).await?;
        info!(
            tx_id = %record.id,
            retries = next.retries,
            state = %next.state,
            "failed transfer re-queued"
        );
        outcome.advanced += 1;
    }

    Ok(outcome)
}
