//! Transaction Relay Engine
//!
//! Drives custodial token transfers through an asynchronous, failure-prone
//! pipeline until each is final or permanently aborted.
//!
//! # Architecture
//!
//! ```text
//! intent ──▶ intake ──▶ record store ──▶ reconcile ──┬──▶ pending   (submit)
//!                                                    ├──▶ confirm   (watch)
//!                                                    └──▶ retry     (re-queue)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Nonce order**: per-sender records are processed strictly in record
//!    nonce order; reconciliation never dispatches past a state change.
//! 2. **Idempotency**: records are keyed by caller-supplied jti; duplicate
//!    intents never consume a second nonce.
//! 3. **Bounded retry**: a failed transfer is re-queued at most
//!    `max_retries` times, then aborted permanently.
//! 4. **Exclusive phases**: the pending and failed phases run under
//!    store-backed try-and-skip locks; overlapping runs do no work.

pub mod confirm;
pub mod db;
pub mod error;
pub mod intake;
pub mod locks;
pub mod machine;
#[cfg(any(test, feature = "mock-api"))]
pub mod memory;
pub mod pending;
pub mod reconcile;
pub mod retry;
pub mod store;
pub mod types;
pub mod worker;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use crate::chain::client::SettlementClient;
use crate::chain::signer::SignerProvider;
use crate::config::RelayConfig;

// Re-exports for convenience
pub use error::RelayError;
pub use intake::{IntakeOutcome, IntakeService};
pub use locks::{LockManager, Phase};
pub use machine::{TxEvent, TxMachine, TxState};
pub use reconcile::{CycleReport, reconcile};
pub use store::{LockFlag, LockStore, RecordStore};
pub use types::{PartyRef, PhaseOutcome, RecordPatch, TransferIntent, TransferRecord};
pub use worker::{RelayWorker, WorkerConfig};

/// Shared dependencies of the phase processors and the reconciliation
/// driver. Everything behind seams; the engine owns no I/O of its own.
pub struct RelayContext {
    pub store: Arc<dyn RecordStore>,
    pub locks: LockManager,
    pub chain: Arc<dyn SettlementClient>,
    pub signer: Arc<SignerProvider>,
    pub cfg: RelayConfig,
}
