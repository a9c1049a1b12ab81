//! Store Seams
//!
//! The engine owns no storage mechanics; it reads and writes records and
//! phase locks through these traits. PostgreSQL backs production (`db.rs`),
//! an in-memory store backs tests and `mock-api` runs (`memory.rs`).

use async_trait::async_trait;

use super::error::RelayError;
use super::types::{PartyRef, RecordPatch, TransferRecord};

/// Persisted phase-lock flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFlag {
    pub locked: bool,
    /// Acquisition timestamp (millis); absent when never locked
    pub locked_at: Option<i64>,
}

/// Transfer record persistence, keyed by idempotency id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record. A colliding id is rejected with `DuplicateRecord`
    /// unless the existing record is `aborted`, in which case the fresh
    /// record replaces it (the only supersede path).
    async fn create(&self, record: &TransferRecord) -> Result<(), RelayError>;

    async fn get(&self, id: &str) -> Result<Option<TransferRecord>, RelayError>;

    /// Merge a partial update into an existing record. Fields absent from
    /// the patch are left untouched.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), RelayError>;

    /// Every record not yet in `success`, ordered by (sender key, nonce).
    /// Aborted records are included: the reconciliation driver needs them as
    /// frontier markers to freeze a sender's queue.
    async fn unresolved(&self) -> Result<Vec<TransferRecord>, RelayError>;

    /// All records for one sender, nonce ascending.
    async fn for_sender(&self, sender: &PartyRef) -> Result<Vec<TransferRecord>, RelayError>;

    /// Highest record nonce assigned to a sender, if any.
    async fn max_nonce(&self, sender: &PartyRef) -> Result<Option<u64>, RelayError>;
}

/// Phase-lock persistence, keyed by phase name.
#[async_trait]
pub trait LockStore: Send + Sync {
    async fn get_lock(&self, name: &str) -> Result<Option<LockFlag>, RelayError>;

    /// Set the flag. Acquiring stamps `locked_at`; releasing leaves the old
    /// stamp in place (only `locked` matters once false).
    async fn set_lock(&self, name: &str, locked: bool) -> Result<(), RelayError>;
}
