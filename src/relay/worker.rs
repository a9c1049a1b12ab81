//! Relay Worker
//!
//! Background loop that runs a reconciliation cycle on a fixed cadence.
//! Ad-hoc triggers reuse `run_once`; the lock manager keeps overlapping
//! cycles from double-processing a phase.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::RelayContext;
use super::reconcile::{CycleReport, reconcile};
use crate::relay::error::RelayError;

/// Configuration for the relay worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to run a reconciliation cycle
    pub scan_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
        }
    }
}

/// Periodic reconciliation driver.
pub struct RelayWorker {
    ctx: Arc<RelayContext>,
    config: WorkerConfig,
}

impl RelayWorker {
    pub fn new(ctx: Arc<RelayContext>, config: WorkerConfig) -> Self {
        Self { ctx, config }
    }

    pub fn with_defaults(ctx: Arc<RelayContext>) -> Self {
        Self::new(ctx, WorkerConfig::default())
    }

    /// Run the reconciliation loop forever.
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            "starting relay worker"
        );

        loop {
            if let Err(e) = self.run_once().await {
                error!(error = %e, "reconciliation cycle failed");
            }

            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    /// Run a single reconciliation cycle.
    pub async fn run_once(&self) -> Result<CycleReport, RelayError> {
        reconcile(&self.ctx).await
    }
}
