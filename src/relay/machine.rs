//! Relay Transaction State Machine
//!
//! State IDs are designed for PostgreSQL storage as SMALLINT.
//! Terminal states: SUCCESS (20), ABORTED (-20)
//!
//! # Transition Contract
//!
//! `TxMachine::transition` is a total function over (state, event) pairs:
//! an event that is not valid for the current state returns the machine
//! UNCHANGED, never an error. Callers that need to know whether an event
//! applies must check `matches()` first. This no-op behavior is load-bearing:
//! phase processors blindly re-apply events after crashes and rely on stale
//! events falling through without corrupting context.
//!
//! The `failed -> aborted` guard is automatic: it is evaluated every time the
//! machine settles into `failed`, including the instant `adjusted` pushes the
//! retry counter to the ceiling. A maxed-out record therefore can never be
//! observed idle in `failed`.

use std::fmt;

/// Relay transaction FSM states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TxState {
    /// Initial state - record created, awaiting submission
    Pending = 0,

    /// Meta-transaction submitted, awaiting on-chain confirmation
    Processing = 10,

    /// Terminal: transfer confirmed on chain
    Success = 20,

    /// Submission or confirmation failed; eligible for bounded retry
    Failed = -10,

    /// Terminal: retry ceiling reached, manual intervention required
    Aborted = -20,
}

impl TxState {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Success | TxState::Aborted)
    }

    /// Get the numeric state ID for PostgreSQL storage
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from PostgreSQL state ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(TxState::Pending),
            10 => Some(TxState::Processing),
            20 => Some(TxState::Success),
            -10 => Some(TxState::Failed),
            -20 => Some(TxState::Aborted),
            _ => None,
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            TxState::Pending => "PENDING",
            TxState::Processing => "PROCESSING",
            TxState::Success => "SUCCESS",
            TxState::Failed => "FAILED",
            TxState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for TxState {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TxState::from_id(value).ok_or(())
    }
}

/// Events accepted by the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    /// Meta-transaction handed to the settlement network
    Submitted { hash: String },
    /// Build/sign/submit failed for this record
    Errored { reason: String },
    /// Record invalidated before submission
    Abort { reason: String },
    /// Receipt observed with enough confirmations
    Mined { hash: String },
    /// Receipt observed but execution did not succeed
    Rejected { reason: String },
    /// Failed record re-queued for another attempt
    Adjusted,
}

/// Machine state plus context, persisted per transfer record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMachine {
    pub state: TxState,
    /// Number of `adjusted` re-queues so far
    pub retries: u32,
    /// Hash returned at submission time (relay handle)
    pub submit_hash: Option<String>,
    /// Final on-chain hash, set on `mined`
    pub tx_hash: Option<String>,
    /// Most recent error/rejection reason
    pub last_error: Option<String>,
}

impl TxMachine {
    /// Fresh machine in the initial state
    pub fn new() -> Self {
        Self {
            state: TxState::Pending,
            retries: 0,
            submit_hash: None,
            tx_hash: None,
            last_error: None,
        }
    }

    #[inline]
    pub fn matches(&self, state: TxState) -> bool {
        self.state == state
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply an event, producing the next machine.
    ///
    /// Total over (state, event): unmatched pairs return `self` unchanged.
    /// `max_retries` parameterizes the automatic `failed -> aborted` guard.
    pub fn transition(&self, event: &TxEvent, max_retries: u32) -> TxMachine {
        let mut next = self.clone();
        match (self.state, event) {
            (TxState::Pending, TxEvent::Submitted { hash }) => {
                next.state = TxState::Processing;
                next.submit_hash = Some(hash.clone());
            }
            (TxState::Pending, TxEvent::Errored { reason }) => {
                next.state = TxState::Failed;
                next.last_error = Some(reason.clone());
            }
            (TxState::Pending, TxEvent::Abort { reason }) => {
                next.state = TxState::Aborted;
                next.last_error = Some(reason.clone());
            }
            (TxState::Processing, TxEvent::Mined { hash }) => {
                next.state = TxState::Success;
                next.tx_hash = Some(hash.clone());
            }
            (TxState::Processing, TxEvent::Rejected { reason }) => {
                next.state = TxState::Failed;
                next.last_error = Some(reason.clone());
            }
            (TxState::Failed, TxEvent::Adjusted) => {
                // The increment happens while the machine is still settling in
                // `failed`; if it reaches the ceiling the automatic guard wins
                // before the record can be considered idle again.
                next.retries += 1;
                next.state = if next.retries >= max_retries {
                    TxState::Aborted
                } else {
                    TxState::Pending
                };
            }
            // Unknown event for the current state: no-op by contract.
            _ => return next,
        }
        next.settle(max_retries);
        next
    }

    /// Evaluate the automatic guard whenever an event settles the machine
    /// into `failed`.
    fn settle(&mut self, max_retries: u32) {
        if self.state == TxState::Failed && self.retries >= max_retries {
            self.state = TxState::Aborted;
        }
    }
}

impl Default for TxMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (retries={})", self.state, self.retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u32 = 5;

    fn submitted() -> TxEvent {
        TxEvent::Submitted {
            hash: "0xaaaa".to_string(),
        }
    }

    fn errored() -> TxEvent {
        TxEvent::Errored {
            reason: "boom".to_string(),
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(TxState::Success.is_terminal());
        assert!(TxState::Aborted.is_terminal());

        assert!(!TxState::Pending.is_terminal());
        assert!(!TxState::Processing.is_terminal());
        assert!(!TxState::Failed.is_terminal());
    }

    #[test]
    fn test_state_id_roundtrip() {
        let states = [
            TxState::Pending,
            TxState::Processing,
            TxState::Success,
            TxState::Failed,
            TxState::Aborted,
        ];

        for state in states {
            let id = state.id();
            let recovered = TxState::from_id(id).unwrap();
            assert_eq!(state, recovered);
        }
    }

    #[test]
    fn test_invalid_state_id() {
        assert!(TxState::from_id(999).is_none());
        assert!(TxState::from_id(-999).is_none());
    }

    #[test]
    fn test_happy_path() {
        let m = TxMachine::new();
        assert!(m.matches(TxState::Pending));

        let m = m.transition(&submitted(), MAX);
        assert!(m.matches(TxState::Processing));
        assert_eq!(m.submit_hash.as_deref(), Some("0xaaaa"));

        let m = m.transition(
            &TxEvent::Mined {
                hash: "0xbbbb".to_string(),
            },
            MAX,
        );
        assert!(m.matches(TxState::Success));
        assert_eq!(m.tx_hash.as_deref(), Some("0xbbbb"));
        assert!(m.is_terminal());
    }

    #[test]
    fn test_failure_and_retry() {
        let m = TxMachine::new().transition(&errored(), MAX);
        assert!(m.matches(TxState::Failed));
        assert_eq!(m.last_error.as_deref(), Some("boom"));

        let m = m.transition(&TxEvent::Adjusted, MAX);
        assert!(m.matches(TxState::Pending));
        assert_eq!(m.retries, 1);
    }

    #[test]
    fn test_rejection_from_processing() {
        let m = TxMachine::new().transition(&submitted(), MAX);
        let m = m.transition(
            &TxEvent::Rejected {
                reason: "reverted".to_string(),
            },
            MAX,
        );
        assert!(m.matches(TxState::Failed));
        assert_eq!(m.last_error.as_deref(), Some("reverted"));
    }

    #[test]
    fn test_invalid_event_is_noop() {
        let m = TxMachine::new();

        // Mined is not valid while pending
        let unchanged = m.transition(
            &TxEvent::Mined {
                hash: "0xcccc".to_string(),
            },
            MAX,
        );
        assert_eq!(unchanged, m);

        // Adjusted is not valid while processing
        let processing = m.transition(&submitted(), MAX);
        let unchanged = processing.transition(&TxEvent::Adjusted, MAX);
        assert_eq!(unchanged, processing);

        // Terminal states accept nothing
        let success = processing.transition(
            &TxEvent::Mined {
                hash: "0xdddd".to_string(),
            },
            MAX,
        );
        let unchanged = success.transition(&errored(), MAX);
        assert_eq!(unchanged, success);
    }

    #[test]
    fn test_guard_fires_on_last_adjust() {
        // Drive a record to retries == MAX - 1 via repeated fail/adjust
        let mut m = TxMachine::new();
        for _ in 0..(MAX - 1) {
            m = m.transition(&errored(), MAX);
            assert!(m.matches(TxState::Failed));
            m = m.transition(&TxEvent::Adjusted, MAX);
        }
        assert_eq!(m.retries, MAX - 1);
        assert!(m.matches(TxState::Pending));

        // One more failure + adjust: the guard must win before the machine
        // can settle back to pending.
        let m = m.transition(&errored(), MAX);
        assert!(m.matches(TxState::Failed));
        let m = m.transition(&TxEvent::Adjusted, MAX);
        assert!(m.matches(TxState::Aborted));
        assert_eq!(m.retries, MAX);
    }

    #[test]
    fn test_guard_fires_entering_failed_at_ceiling() {
        let m = TxMachine {
            state: TxState::Processing,
            retries: MAX,
            submit_hash: Some("0xaaaa".to_string()),
            tx_hash: None,
            last_error: None,
        };

        // Entering failed with the counter already maxed settles straight
        // into aborted.
        let m = m.transition(
            &TxEvent::Rejected {
                reason: "reverted".to_string(),
            },
            MAX,
        );
        assert!(m.matches(TxState::Aborted));
    }

    #[test]
    fn test_abort_before_submission() {
        let m = TxMachine::new().transition(
            &TxEvent::Abort {
                reason: "invalid receiver".to_string(),
            },
            MAX,
        );
        assert!(m.matches(TxState::Aborted));
        assert_eq!(m.last_error.as_deref(), Some("invalid receiver"));
    }

    #[test]
    fn test_display() {
        assert_eq!(TxState::Pending.to_string(), "PENDING");
        assert_eq!(TxState::Aborted.to_string(), "ABORTED");
        let m = TxMachine::new();
        assert_eq!(m.to_string(), "PENDING (retries=0)");
    }
}
