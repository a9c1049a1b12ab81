//! Record Intake
//!
//! Turns a validated transfer intent into a persisted record: idempotency
//! check, address resolution, call encoding (once, never recomputed), and
//! per-sender nonce assignment. Invoked asynchronously behind the dispatch
//! channel; the HTTP handler never creates records itself.

use std::sync::Arc;

use tracing::{info, warn};

use super::machine::TxState;
use super::store::RecordStore;
use super::types::{PartyRef, TransferIntent, TransferRecord};
use crate::chain::abi::{encode_transfer, encode_transfer_from};
use crate::chain::signer::SignerProvider;
use crate::relay::error::RelayError;

/// Result of an intake attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Fresh record created under this id
    Created(String),
    /// A live record already exists for this id; nothing was written and no
    /// nonce was consumed
    Duplicate(String),
}

pub struct IntakeService {
    store: Arc<dyn RecordStore>,
    signer: Arc<SignerProvider>,
    /// Token contract all encoded calls target
    token_address: String,
}

impl IntakeService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        signer: Arc<SignerProvider>,
        token_address: String,
    ) -> Self {
        Self {
            store,
            signer,
            token_address,
        }
    }

    /// Create the transfer record for an intent.
    ///
    /// Idempotent on `jti`: a collision with a live record returns
    /// `Duplicate` without consuming a nonce; only an aborted record may be
    /// superseded by a fresh intent under the same id.
    pub async fn create_from_intent(
        &self,
        intent: TransferIntent,
    ) -> Result<IntakeOutcome, RelayError> {
        if intent.amount == 0 {
            return Err(RelayError::InvalidAmount);
        }

        if let Some(existing) = self.store.get(&intent.jti).await?
            && !existing.machine.matches(TxState::Aborted)
        {
            warn!(tx_id = %intent.jti, state = %existing.machine.state, "repeated transfer intent");
            return Ok(IntakeOutcome::Duplicate(existing.id));
        }

        let sender_address = self.resolve_address(&intent.sender);
        let receiver_address = self.resolve_address(&intent.receiver);

        // Internal senders transfer their own balance; external senders are
        // executed by the relay as an allowance-approved third party.
        let encoded_call = if intent.sender.is_internal() {
            encode_transfer(&receiver_address, intent.amount)?
        } else {
            encode_transfer_from(&sender_address, &receiver_address, intent.amount)?
        };

        let nonce = match self.store.max_nonce(&intent.sender).await? {
            Some(highest) => highest + 1,
            None => 0,
        };

        let record = TransferRecord::new(
            intent.jti.clone(),
            intent.sender,
            intent.receiver,
            intent.amount,
            self.token_address.clone(),
            encoded_call,
            nonce,
        );
        self.store.create(&record).await?;

        info!(
            tx_id = %record.id,
            sender = %record.sender,
            receiver = %record.receiver,
            amount = record.amount,
            nonce = record.nonce,
            "transfer record created"
        );
        Ok(IntakeOutcome::Created(record.id))
    }

    fn resolve_address(&self, party: &PartyRef) -> String {
        match party {
            PartyRef::Internal(user_id) => self.signer.address_for(*user_id),
            PartyRef::External(wallet) => wallet.clone(),
        }
    }
}
