//! Settlement Network Client Seam
//!
//! The settlement network is an opaque external system; the engine consumes
//! it through this narrow interface only. Submission is gas-sponsored: the
//! relay hands over a signed forward request and the network's relay layer
//! pays for execution.

use async_trait::async_trait;

use crate::relay::error::RelayError;

/// A meta-transaction forward request, signed off-chain by the owner and
/// verified on chain by the forwarder contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRequest {
    /// Owner address the forwarder verifies the signature against
    pub from: String,
    /// Target contract (the token)
    pub to: String,
    /// Native value, always 0 for token transfers
    pub value: u64,
    /// Gas allotment for the inner call
    pub gas: u64,
    /// Forwarder-tracked nonce of `from` (NOT the record-store nonce)
    pub nonce: u64,
    /// Prepared inner call
    pub data: Vec<u8>,
}

impl ForwardRequest {
    /// Canonical byte encoding signed by the owner. Field order is part of
    /// the wire contract with the forwarder.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128 + self.data.len());
        payload.extend_from_slice(chain_id.to_be_bytes().as_ref());
        payload.extend_from_slice(self.from.to_lowercase().as_bytes());
        payload.extend_from_slice(self.to.to_lowercase().as_bytes());
        payload.extend_from_slice(self.value.to_be_bytes().as_ref());
        payload.extend_from_slice(self.gas.to_be_bytes().as_ref());
        payload.extend_from_slice(self.nonce.to_be_bytes().as_ref());
        payload.extend_from_slice(&self.data);
        payload
    }
}

/// A forward request plus the owner's signature, ready for submission.
#[derive(Debug, Clone)]
pub struct SignedForward {
    pub request: ForwardRequest,
    pub signature: Vec<u8>,
}

/// On-chain receipt for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
    /// Execution success flag
    pub status: bool,
    /// Depth of the containing block below the tip, inclusive
    pub confirmations: u64,
    /// Number of log entries the execution produced; a successful token
    /// transfer emits at least one
    pub log_count: usize,
}

/// Result of waiting for a submission to confirm.
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Confirmed(Receipt),
    /// Not confirmed within the polling budget; the confirmation watcher
    /// picks the record up on a later cycle.
    RetryLater,
}

/// Narrow settlement-network interface consumed by the engine.
#[async_trait]
pub trait SettlementClient: Send + Sync {
    /// Network/chain identifier baked into signing payloads
    fn chain_id(&self) -> u64;

    /// Current gas price in the network's smallest price unit
    async fn gas_price(&self) -> Result<u128, RelayError>;

    /// Gas estimate for executing `data` against `to` on behalf of `from`
    async fn estimate_gas(&self, from: &str, to: &str, data: &[u8]) -> Result<u64, RelayError>;

    /// Submit a signed forward request at the given gas terms. Returns the
    /// submission handle/hash.
    async fn submit(
        &self,
        call: &SignedForward,
        gas_price: u128,
        gas_limit: u64,
    ) -> Result<String, RelayError>;

    /// Wait until the submission has at least `confirmations`, or report
    /// `RetryLater` once the polling budget is exhausted.
    async fn wait(&self, submit_hash: &str, confirmations: u64) -> Result<WaitOutcome, RelayError>;

    /// Fetch the receipt for a hash, if the transaction is known.
    async fn receipt(&self, hash: &str) -> Result<Option<Receipt>, RelayError>;

    /// Forwarder-tracked nonce for an owner address.
    async fn forwarder_nonce(&self, owner: &str) -> Result<u64, RelayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_payload_binds_all_fields() {
        let base = ForwardRequest {
            from: "0xAA00000000000000000000000000000000000001".to_string(),
            to: "0xbb00000000000000000000000000000000000002".to_string(),
            value: 0,
            gas: 100_000,
            nonce: 3,
            data: vec![1, 2, 3],
        };

        let payload = base.signing_payload(137);

        // Same request, case-shifted address: payload is case-insensitive
        let mut shifted = base.clone();
        shifted.from = shifted.from.to_lowercase();
        assert_eq!(shifted.signing_payload(137), payload);

        // Any semantic change must change the payload
        let mut other = base.clone();
        other.nonce = 4;
        assert_ne!(other.signing_payload(137), payload);

        assert_ne!(base.signing_payload(1), payload);
    }
}
