//! Phase Lock Manager
//!
//! Named, time-boxed mutual-exclusion flags stored alongside the records.
//! Acquisition is optimistic try-and-skip: a processor that finds the lock
//! held does no work and returns, relying on the next cycle to retry.
//!
//! A lock held longer than the staleness window is treated as released.
//! This is a liveness safety valve against crashed holders, NOT a fence: it
//! cannot distinguish a crashed holder from a merely slow one, so duplicate
//! submission under heavy load is a known, accepted risk.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::RelayError;
use super::store::LockStore;

/// The three processing phases, each with its own lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pending,
    Processing,
    Failed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Processing => "processing",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store-backed lock manager shared by the phase processors.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    stale_after: Duration,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, stale_after: Duration) -> Self {
        Self { store, stale_after }
    }

    /// Try to take a phase lock. Returns `false` (without blocking) when the
    /// lock is held and fresh; a stale flag is overwritten.
    pub async fn try_acquire(&self, phase: Phase) -> Result<bool, RelayError> {
        if self.is_held(phase).await? {
            return Ok(false);
        }
        self.store.set_lock(phase.as_str(), true).await?;
        debug!(lock = %phase, "phase lock acquired");
        Ok(true)
    }

    /// Advisory check: is the lock currently held (and not stale)?
    pub async fn is_held(&self, phase: Phase) -> Result<bool, RelayError> {
        let Some(flag) = self.store.get_lock(phase.as_str()).await? else {
            return Ok(false);
        };
        if !flag.locked {
            return Ok(false);
        }
        let now = chrono::Utc::now().timestamp_millis();
        let age_ms = flag.locked_at.map(|at| now.saturating_sub(at));
        match age_ms {
            Some(age) if age as u128 > self.stale_after.as_millis() => {
                warn!(
                    lock = %phase,
                    age_ms = age,
                    "phase lock is stale; treating as released"
                );
                Ok(false)
            }
            // A locked flag with no timestamp cannot age out; honor it.
            _ => Ok(true),
        }
    }

    /// Release a phase lock. Processors call this on every exit path.
    pub async fn release(&self, phase: Phase) -> Result<(), RelayError> {
        self.store.set_lock(phase.as_str(), false).await?;
        debug!(lock = %phase, "phase lock released");
        Ok(())
    }
}
