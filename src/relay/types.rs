//! Relay Core Types
//!
//! Type definitions for transfer intents and persisted transfer records.

use std::fmt;

use super::machine::TxMachine;

/// One side of a transfer: either an internal custodial user (key derived
/// and held by this service) or an external wallet address.
///
/// Exactly one representation holds per party; the two never mix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartyRef {
    /// Internal custodial user id
    Internal(u64),
    /// External wallet address (0x-prefixed hex, stored lowercase)
    External(String),
}

impl PartyRef {
    pub fn external(address: impl Into<String>) -> Self {
        PartyRef::External(address.into().to_lowercase())
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(self, PartyRef::Internal(_))
    }

    /// Stable grouping key: nonce sequences and batch partitions are scoped
    /// to this value.
    pub fn key(&self) -> String {
        match self {
            PartyRef::Internal(user_id) => format!("user:{}", user_id),
            PartyRef::External(wallet) => format!("wallet:{}", wallet),
        }
    }

    /// Child-key index used to sign for this party. External wallets are
    /// never signed locally; their transfers are executed by the relay's own
    /// key at index 0 (via a third-party `transferFrom`).
    pub fn signer_index(&self) -> u64 {
        match self {
            PartyRef::Internal(user_id) => *user_id,
            PartyRef::External(_) => 0,
        }
    }

    /// Rebuild from the store's split columns. `None` when neither (or both)
    /// representation is present.
    pub fn from_parts(user_id: Option<i64>, wallet: Option<String>) -> Option<Self> {
        match (user_id, wallet) {
            (Some(uid), None) if uid >= 0 => Some(PartyRef::Internal(uid as u64)),
            (None, Some(w)) => Some(PartyRef::external(w)),
            _ => None,
        }
    }

    /// Store columns for this party: (user_id, wallet)
    pub fn to_parts(&self) -> (Option<i64>, Option<String>) {
        match self {
            PartyRef::Internal(uid) => (Some(*uid as i64), None),
            PartyRef::External(w) => (None, Some(w.clone())),
        }
    }
}

// Display writes the grouping key; it shows up in every engine log line.
impl fmt::Display for PartyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A validated request to move `amount` from `sender` to `receiver`,
/// identified by the caller-supplied idempotency key `jti`.
///
/// Intents arrive at the boundary as signed tokens; by the time one reaches
/// the engine it is structurally valid (positive amount, exactly one sender
/// and one receiver representation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    /// Idempotency identifier (JWT `jti`)
    pub jti: String,
    pub sender: PartyRef,
    pub receiver: PartyRef,
    /// Positive amount in the token's smallest unit
    pub amount: u64,
}

/// Persisted transfer record, one per idempotency id.
///
/// Created once by the intake path; mutated only by the phase processors
/// (state transitions, hash attachment, retry counter) and by the
/// out-of-scope feedback notifier (`synced`). Never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Caller-supplied idempotency key; immutable once created
    pub id: String,
    pub sender: PartyRef,
    pub receiver: PartyRef,
    /// Amount in smallest token unit
    pub amount: u64,
    /// Token contract the encoded call targets
    pub call_target: String,
    /// Prepared on-chain call (transfer / transferFrom), computed once at
    /// creation and never recomputed
    pub encoded_call: Vec<u8>,
    /// Per-sender record nonce: contiguous, gapless, assigned at creation.
    /// Distinct from the settlement network's forwarder-tracked nonce.
    pub nonce: u64,
    /// Machine state + context
    pub machine: TxMachine,
    /// Feedback-acknowledged flag, owned by the out-of-scope notifier
    pub synced: Option<bool>,
    /// Creation timestamp (millis)
    pub created_at: i64,
    /// First on-chain submission timestamp (millis)
    pub sent_at: Option<i64>,
}

impl TransferRecord {
    /// Create a new record in the machine's initial state.
    pub fn new(
        id: String,
        sender: PartyRef,
        receiver: PartyRef,
        amount: u64,
        call_target: String,
        encoded_call: Vec<u8>,
        nonce: u64,
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            amount,
            call_target,
            encoded_call,
            nonce,
            machine: TxMachine::new(),
            synced: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            sent_at: None,
        }
    }
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} -> {} amount={} nonce={} state={}",
            self.id, self.sender, self.receiver, self.amount, self.nonce, self.machine.state
        )
    }
}

/// Partial record update, merged into the stored record.
///
/// Only the fields the engine is allowed to touch are expressible here; id,
/// parties, amount, call and nonce are immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub machine: Option<TxMachine>,
    pub sent_at: Option<i64>,
    pub synced: Option<bool>,
}

impl RecordPatch {
    pub fn machine(machine: TxMachine) -> Self {
        Self {
            machine: Some(machine),
            ..Self::default()
        }
    }

    pub fn submitted(machine: TxMachine, sent_at: i64) -> Self {
        Self {
            machine: Some(machine),
            sent_at: Some(sent_at),
            synced: None,
        }
    }

    pub fn synced(flag: bool) -> Self {
        Self {
            synced: Some(flag),
            ..Self::default()
        }
    }
}

/// Per-phase run summary, bubbled up into the cycle report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Run skipped because the phase lock was held
    pub skipped: bool,
    /// Records moved forward (submitted / confirmed / re-queued)
    pub advanced: usize,
    /// Records pushed onto the failure branch
    pub errored: usize,
}

impl PhaseOutcome {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::machine::TxState;

    #[test]
    fn test_party_ref_keys() {
        assert_eq!(PartyRef::Internal(7).key(), "user:7");
        assert_eq!(
            PartyRef::external("0xABCDEF0123456789abcdef0123456789ABCDEF01").key(),
            "wallet:0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_party_ref_signer_index() {
        assert_eq!(PartyRef::Internal(42).signer_index(), 42);
        assert_eq!(PartyRef::external("0xdead").signer_index(), 0);
    }

    #[test]
    fn test_party_ref_parts_roundtrip() {
        let internal = PartyRef::Internal(9);
        let (uid, wallet) = internal.to_parts();
        assert_eq!(PartyRef::from_parts(uid, wallet), Some(internal));

        let external = PartyRef::external("0xfeed");
        let (uid, wallet) = external.to_parts();
        assert_eq!(PartyRef::from_parts(uid, wallet), Some(external));

        // Exactly one representation must hold
        assert_eq!(PartyRef::from_parts(None, None), None);
        assert_eq!(
            PartyRef::from_parts(Some(1), Some("0xfeed".to_string())),
            None
        );
    }

    #[test]
    fn test_record_new_is_pending() {
        let record = TransferRecord::new(
            "jti-1".to_string(),
            PartyRef::Internal(1),
            PartyRef::external("0xfeed"),
            1_000,
            "0xt0ken".to_string(),
            vec![0xa9, 0x05, 0x9c, 0xbb],
            0,
        );

        assert!(record.machine.matches(TxState::Pending));
        assert_eq!(record.machine.retries, 0);
        assert!(record.sent_at.is_none());
        assert!(record.synced.is_none());
    }
}
