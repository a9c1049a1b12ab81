//! Reconciliation Driver
//!
//! The single entry point behind both the periodic worker and the on-demand
//! trigger. Re-derives the work batches from persisted records: group by
//! sender, inspect the lowest-nonce (frontier) record, and take the
//! contiguous run of records sharing its state. A sender whose frontier is
//! `aborted` has its whole queue frozen until an operator intervenes —
//! advancing past it would break the nonce ordering guarantee.
//!
//! The three phase batches run concurrently (disjoint state partitions);
//! within a phase, records are processed by that phase's sequential loop.
//! No cross-sender parallelism is attempted: signer-nonce safety over
//! throughput.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::RelayContext;
use super::confirm::process_processing;
use super::machine::TxState;
use super::pending::process_pending;
use super::retry::process_failed;
use super::store::RecordStore;
use super::types::{PhaseOutcome, TransferRecord};
use crate::relay::error::RelayError;

/// Batches assembled for one cycle, keyed by frontier state.
#[derive(Debug, Default)]
pub struct PhaseBatches {
    pub pending: Vec<TransferRecord>,
    pub processing: Vec<TransferRecord>,
    pub failed: Vec<TransferRecord>,
    /// Senders skipped because their frontier record is aborted
    pub frozen_senders: usize,
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    pub pending: PhaseOutcome,
    pub processing: PhaseOutcome,
    pub failed: PhaseOutcome,
    pub frozen_senders: usize,
}

/// Run one full reconciliation cycle.
pub async fn reconcile(ctx: &RelayContext) -> Result<CycleReport, RelayError> {
    let records = ctx.store.unresolved().await?;
    let batches = partition_batches(records);
    let frozen_senders = batches.frozen_senders;

    debug!(
        pending = batches.pending.len(),
        processing = batches.processing.len(),
        failed = batches.failed.len(),
        frozen_senders,
        "reconciliation batches assembled"
    );

    let PhaseBatches {
        pending, processing, failed, ..
    } = batches;

    // Phases touch disjoint state partitions and may run concurrently.
    let (pending_out, processing_out, failed_out) = tokio::join!(
        async {
            if pending.is_empty() {
                Ok(PhaseOutcome::default())
            } else {
                process_pending(ctx, pending).await
            }
        },
        async {
            if processing.is_empty() {
                Ok(PhaseOutcome::default())
            } else {
                process_processing(ctx, processing).await
            }
        },
        async {
            if failed.is_empty() {
                Ok(PhaseOutcome::default())
            } else {
                process_failed(ctx, failed).await
            }
        },
    );

    let report = CycleReport {
        pending: pending_out?,
        processing: processing_out?,
        failed: failed_out?,
        frozen_senders,
    };
    info!(
        submitted = report.pending.advanced,
        confirmed = report.processing.advanced,
        requeued = report.failed.advanced,
        errored = report.pending.errored + report.processing.errored,
        frozen_senders = report.frozen_senders,
        "reconciliation cycle complete"
    );
    Ok(report)
}

/// Pure batch assembly: per sender, the frontier record's state decides
/// which phase (if any) receives the contiguous matching prefix. A sender
/// never contributes to two phases in the same cycle.
pub fn partition_batches(records: Vec<TransferRecord>) -> PhaseBatches {
    let mut by_sender: BTreeMap<String, Vec<TransferRecord>> = BTreeMap::new();
    for record in records {
        by_sender.entry(record.sender.key()).or_default().push(record);
    }

    let mut batches = PhaseBatches::default();
    for (sender, mut group) in by_sender {
        group.sort_by_key(|r| r.nonce);
        let Some(frontier) = group.first() else {
            continue;
        };

        if frontier.machine.matches(TxState::Aborted) {
            warn!(
                sender = %sender,
                tx_id = %frontier.id,
                queued = group.len(),
                "frontier transfer aborted; sender queue frozen pending manual intervention"
            );
            batches.frozen_senders += 1;
            continue;
        }

        let frontier_state = frontier.machine.state;
        let batch = match frontier_state {
            TxState::Pending => &mut batches.pending,
            TxState::Processing => &mut batches.processing,
            TxState::Failed => &mut batches.failed,
            // Success is filtered out upstream; aborted handled above.
            TxState::Success | TxState::Aborted => continue,
        };
        for record in group {
            if record.machine.matches(frontier_state) {
                batch.push(record);
            } else {
                // The frontier run stops at the first state change; later
                // records wait for a future cycle.
                break;
            }
        }
    }

    batches
}
