//! Mock Settlement Network
//!
//! Scriptable in-process chain used by tests and `mock-api` dev runs:
//! submissions mine instantly, failures are injected per forwarder nonce or
//! per hash, and every accepted submission is recorded for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::RngCore;

use super::client::{Receipt, SettlementClient, SignedForward, WaitOutcome};
use crate::relay::error::RelayError;

/// One accepted submission, kept for test assertions.
#[derive(Debug, Clone)]
pub struct Submission {
    pub hash: String,
    pub from: String,
    pub forwarder_nonce: u64,
    pub gas_price: u128,
}

#[derive(Default)]
struct MockChainState {
    forwarder_nonces: HashMap<String, u64>,
    receipts: HashMap<String, Receipt>,
    submissions: Vec<Submission>,
    /// Submissions with these forwarder nonces are refused
    fail_submit_nonces: HashSet<u64>,
    /// Receipt fetches for these hashes error out
    fail_receipt_hashes: HashSet<String>,
    block_number: u64,
}

pub struct MockChain {
    chain_id: u64,
    gas_price: u128,
    state: Mutex<MockChainState>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            gas_price: 30_000_000_000,
            state: Mutex::new(MockChainState::default()),
        }
    }

    /// Refuse submissions carrying this forwarder nonce.
    pub fn fail_submit_at(&self, forwarder_nonce: u64) {
        self.state
            .lock()
            .unwrap()
            .fail_submit_nonces
            .insert(forwarder_nonce);
    }

    /// Make receipt fetches for `hash` error (transient infra failure).
    pub fn fail_receipt_for(&self, hash: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_receipt_hashes
            .insert(hash.to_string());
    }

    /// Install or overwrite a receipt (e.g. a reverted execution).
    pub fn set_receipt(&self, hash: &str, receipt: Receipt) {
        self.state
            .lock()
            .unwrap()
            .receipts
            .insert(hash.to_string(), receipt);
    }

    /// Pre-set the forwarder nonce for an owner.
    pub fn set_forwarder_nonce(&self, owner: &str, nonce: u64) {
        self.state
            .lock()
            .unwrap()
            .forwarder_nonces
            .insert(owner.to_lowercase(), nonce);
    }

    /// Snapshot of accepted submissions, in order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn submitted_count(&self) -> usize {
        self.state.lock().unwrap().submissions.len()
    }

    fn random_hash() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("0x{}", hex::encode(bytes))
    }
}

#[async_trait]
impl SettlementClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn gas_price(&self) -> Result<u128, RelayError> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _from: &str, _to: &str, data: &[u8]) -> Result<u64, RelayError> {
        Ok(21_000 + 16 * data.len() as u64)
    }

    async fn submit(
        &self,
        call: &SignedForward,
        gas_price: u128,
        _gas_limit: u64,
    ) -> Result<String, RelayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submit_nonces.contains(&call.request.nonce) {
            return Err(RelayError::Chain(format!(
                "submission refused at nonce {}",
                call.request.nonce
            )));
        }

        let hash = Self::random_hash();
        state.block_number += 1;
        let block_number = state.block_number;

        // Mine instantly: a healthy transfer produces one log entry.
        state.receipts.insert(
            hash.clone(),
            Receipt {
                tx_hash: hash.clone(),
                block_number,
                status: true,
                confirmations: 1,
                log_count: 1,
            },
        );

        let owner = call.request.from.to_lowercase();
        let next = state.forwarder_nonces.entry(owner).or_insert(0);
        *next += 1;

        state.submissions.push(Submission {
            hash: hash.clone(),
            from: call.request.from.clone(),
            forwarder_nonce: call.request.nonce,
            gas_price,
        });

        Ok(hash)
    }

    async fn wait(&self, submit_hash: &str, _confirmations: u64) -> Result<WaitOutcome, RelayError> {
        let state = self.state.lock().unwrap();
        match state.receipts.get(submit_hash) {
            Some(receipt) => Ok(WaitOutcome::Confirmed(receipt.clone())),
            None => Ok(WaitOutcome::RetryLater),
        }
    }

    async fn receipt(&self, hash: &str) -> Result<Option<Receipt>, RelayError> {
        let state = self.state.lock().unwrap();
        if state.fail_receipt_hashes.contains(hash) {
            return Err(RelayError::Chain("receipt fetch failed".to_string()));
        }
        Ok(state.receipts.get(hash).cloned())
    }

    async fn forwarder_nonce(&self, owner: &str) -> Result<u64, RelayError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .forwarder_nonces
            .get(&owner.to_lowercase())
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::ForwardRequest;

    fn signed(nonce: u64) -> SignedForward {
        SignedForward {
            request: ForwardRequest {
                from: "0xAA00000000000000000000000000000000000001".to_string(),
                to: "0xbb00000000000000000000000000000000000002".to_string(),
                value: 0,
                gas: 50_000,
                nonce,
                data: vec![1, 2, 3],
            },
            signature: vec![0u8; 64],
        }
    }

    #[tokio::test]
    async fn test_submit_mines_and_tracks_nonce() {
        let chain = MockChain::new(31337);
        assert_eq!(
            chain
                .forwarder_nonce("0xaa00000000000000000000000000000000000001")
                .await
                .unwrap(),
            0
        );

        let hash = chain.submit(&signed(0), 1, 50_000).await.unwrap();
        assert_eq!(
            chain
                .forwarder_nonce("0xAA00000000000000000000000000000000000001")
                .await
                .unwrap(),
            1
        );

        let receipt = chain.receipt(&hash).await.unwrap().unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.log_count, 1);

        match chain.wait(&hash, 1).await.unwrap() {
            WaitOutcome::Confirmed(r) => assert_eq!(r.tx_hash, hash),
            WaitOutcome::RetryLater => panic!("expected confirmation"),
        }
    }

    #[tokio::test]
    async fn test_injected_submit_failure() {
        let chain = MockChain::new(31337);
        chain.fail_submit_at(1);

        assert!(chain.submit(&signed(0), 1, 50_000).await.is_ok());
        assert!(chain.submit(&signed(1), 1, 50_000).await.is_err());
        assert_eq!(chain.submitted_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_receipt_failure() {
        let chain = MockChain::new(31337);
        let hash = chain.submit(&signed(0), 1, 50_000).await.unwrap();

        chain.fail_receipt_for(&hash);
        assert!(chain.receipt(&hash).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_hash_waits() {
        let chain = MockChain::new(31337);
        assert!(matches!(
            chain.wait("0xmissing", 1).await.unwrap(),
            WaitOutcome::RetryLater
        ));
        assert_eq!(chain.receipt("0xmissing").await.unwrap(), None);
    }
}
