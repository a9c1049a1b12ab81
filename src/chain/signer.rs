//! Custodial Signer Provider
//!
//! Child signing keys are derived deterministically from a single root seed;
//! the service holds keys for internal users only. External wallets appear
//! exclusively as addresses and are never signed locally.
//!
//! Index 0 is the relay's own executor key: it signs `transferFrom` requests
//! for external senders and is the address reported by the health endpoint.

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use super::client::{ForwardRequest, SignedForward};
use crate::relay::error::RelayError;
use crate::relay::types::PartyRef;

/// Derives child signers from a 32-byte root seed.
pub struct SignerProvider {
    root_seed: [u8; 32],
}

impl SignerProvider {
    /// Build from a 0x-optional hex-encoded 32-byte seed.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, RelayError> {
        let stripped = seed_hex.strip_prefix("0x").unwrap_or(seed_hex);
        let bytes = hex::decode(stripped)
            .map_err(|e| RelayError::Signer(format!("invalid seed hex: {}", e)))?;
        let root_seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| RelayError::Signer("seed must be 32 bytes".to_string()))?;
        Ok(Self { root_seed })
    }

    /// Derive the child signer at `index`. Derivation is seed || index over
    /// SHA-256, so the same seed always yields the same keyspace.
    pub fn derive(&self, index: u64) -> ChildSigner {
        let mut hasher = Sha256::new();
        hasher.update(self.root_seed);
        hasher.update(b"/");
        hasher.update(index.to_be_bytes());
        let child_seed: [u8; 32] = hasher.finalize().into();
        ChildSigner {
            index,
            key: SigningKey::from_bytes(&child_seed),
        }
    }

    /// Derived on-chain address for a child index.
    pub fn address_for(&self, index: u64) -> String {
        self.derive(index).address()
    }

    /// The signer responsible for a sender: internal users sign for
    /// themselves, external wallets are executed by the relay key (index 0).
    pub fn signer_for(&self, sender: &PartyRef) -> ChildSigner {
        self.derive(sender.signer_index())
    }

    /// The relay's own executor address (child 0).
    pub fn relayer_address(&self) -> String {
        self.address_for(0)
    }
}

/// One derived child key.
pub struct ChildSigner {
    index: u64,
    key: SigningKey,
}

impl ChildSigner {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Address: last 20 bytes of SHA-256 over the public key, hex encoded.
    pub fn address(&self) -> String {
        let digest = Sha256::digest(self.key.verifying_key().as_bytes());
        format!("0x{}", hex::encode(&digest[12..]))
    }

    /// Sign a forward request over the SHA-256 digest of its canonical
    /// encoding.
    pub fn sign_forward(&self, request: ForwardRequest, chain_id: u64) -> SignedForward {
        let digest = Sha256::digest(request.signing_payload(chain_id));
        let signature = self.key.sign(&digest).to_bytes().to_vec();
        SignedForward { request, signature }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "0x0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_seed_parsing() {
        assert!(SignerProvider::from_seed_hex(SEED).is_ok());
        assert!(SignerProvider::from_seed_hex("0xdeadbeef").is_err());
        assert!(SignerProvider::from_seed_hex("not-hex").is_err());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = SignerProvider::from_seed_hex(SEED).unwrap();
        let b = SignerProvider::from_seed_hex(SEED).unwrap();

        assert_eq!(a.address_for(7), b.address_for(7));
        assert_ne!(a.address_for(7), a.address_for(8));
    }

    #[test]
    fn test_address_shape() {
        let provider = SignerProvider::from_seed_hex(SEED).unwrap();
        let address = provider.relayer_address();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 42);
    }

    #[test]
    fn test_signer_for_party() {
        let provider = SignerProvider::from_seed_hex(SEED).unwrap();

        let internal = provider.signer_for(&PartyRef::Internal(5));
        assert_eq!(internal.index(), 5);

        // External senders are executed by the relay key
        let external = provider.signer_for(&PartyRef::external("0xfeed"));
        assert_eq!(external.index(), 0);
        assert_eq!(external.address(), provider.relayer_address());
    }

    #[test]
    fn test_sign_forward_attaches_signature() {
        let provider = SignerProvider::from_seed_hex(SEED).unwrap();
        let signer = provider.derive(1);
        let request = ForwardRequest {
            from: signer.address(),
            to: "0x0000000000000000000000000000000000000001".to_string(),
            value: 0,
            gas: 100_000,
            nonce: 0,
            data: vec![1, 2, 3],
        };

        let signed = signer.sign_forward(request.clone(), 137);
        assert_eq!(signed.request, request);
        assert_eq!(signed.signature.len(), 64);

        // Different nonce, different signature
        let mut bumped = request;
        bumped.nonce = 1;
        let signed2 = signer.sign_forward(bumped, 137);
        assert_ne!(signed.signature, signed2.signature);
    }
}
