//! Shared test fixtures for the relay engine.

use std::sync::Arc;
use std::time::Duration;

use super::RelayContext;
use super::locks::LockManager;
use super::machine::{TxEvent, TxMachine};
use super::memory::MemoryStore;
use super::store::RecordStore;
use super::types::{PartyRef, TransferRecord};
use crate::chain::abi::encode_transfer;
use crate::chain::mock::MockChain;
use crate::chain::signer::SignerProvider;
use crate::config::RelayConfig;

pub const TEST_SEED: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";
pub const TEST_TOKEN: &str = "0x0000000000000000000000000000000000000010";
pub const TEST_RECEIVER: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

/// Engine context over a fresh in-memory store and mock chain.
pub fn test_context() -> (RelayContext, Arc<MemoryStore>, Arc<MockChain>) {
    let store = Arc::new(MemoryStore::new());
    let chain = Arc::new(MockChain::new(31337));
    let ctx = RelayContext {
        store: store.clone(),
        locks: LockManager::new(store.clone(), Duration::from_secs(300)),
        chain: chain.clone(),
        signer: Arc::new(SignerProvider::from_seed_hex(TEST_SEED).unwrap()),
        cfg: RelayConfig::default(),
    };
    (ctx, store, chain)
}

/// A record in the initial state, not yet persisted.
pub fn bare_record(id: &str, sender: PartyRef, nonce: u64) -> TransferRecord {
    TransferRecord::new(
        id.to_string(),
        sender,
        PartyRef::external(TEST_RECEIVER),
        1_000,
        TEST_TOKEN.to_string(),
        encode_transfer(TEST_RECEIVER, 1_000).unwrap(),
        nonce,
    )
}

/// Persist and return a pending record for an internal sender.
pub async fn pending_record(
    store: &Arc<MemoryStore>,
    id: &str,
    user_id: u64,
    nonce: u64,
) -> TransferRecord {
    let record = bare_record(id, PartyRef::Internal(user_id), nonce);
    store.create(&record).await.unwrap();
    record
}

/// Persist and return a processing record carrying a submission hash.
pub async fn processing_record(
    store: &Arc<MemoryStore>,
    id: &str,
    user_id: u64,
    nonce: u64,
    submit_hash: &str,
) -> TransferRecord {
    let mut record = bare_record(id, PartyRef::Internal(user_id), nonce);
    record.machine = record.machine.transition(
        &TxEvent::Submitted {
            hash: submit_hash.to_string(),
        },
        u32::MAX,
    );
    record.sent_at = Some(record.created_at);
    store.create(&record).await.unwrap();
    record
}

/// Persist and return a failed record with a given retry count.
pub async fn failed_record(
    store: &Arc<MemoryStore>,
    id: &str,
    user_id: u64,
    nonce: u64,
    retries: u32,
) -> TransferRecord {
    let mut record = bare_record(id, PartyRef::Internal(user_id), nonce);
    let mut machine = TxMachine::new().transition(
        &TxEvent::Errored {
            reason: "injected failure".to_string(),
        },
        u32::MAX,
    );
    machine.retries = retries;
    record.machine = machine;
    store.create(&record).await.unwrap();
    record
}
