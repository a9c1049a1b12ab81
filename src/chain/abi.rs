//! Minimal Call Encoding
//!
//! The engine only ever encodes three calls: the token's `transfer` and
//! `transferFrom`, and the forwarder's `getNonce` view. Encoding is the
//! standard 4-byte selector followed by 32-byte words; it happens exactly
//! once, at record creation, and the resulting bytes are treated as opaque
//! everywhere else.

use crate::relay::error::RelayError;

/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `transferFrom(address,address,uint256)`
pub const TRANSFER_FROM_SELECTOR: [u8; 4] = [0x23, 0xb8, 0x72, 0xdd];
/// `getNonce(address)`
pub const GET_NONCE_SELECTOR: [u8; 4] = [0x2d, 0x03, 0x35, 0xab];

/// Decode a 0x-prefixed 20-byte address into a right-aligned 32-byte word.
fn address_word(address: &str) -> Result<[u8; 32], RelayError> {
    let stripped = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let bytes = hex::decode(stripped)
        .map_err(|_| RelayError::InvalidIntent(format!("invalid address: {}", address)))?;
    if bytes.len() != 20 {
        return Err(RelayError::InvalidIntent(format!(
            "invalid address length: {}",
            address
        )));
    }
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// Encode a u64 amount into a right-aligned 32-byte word.
fn amount_word(amount: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&amount.to_be_bytes());
    word
}

/// `transfer(to, amount)` — used when the sender is an internal custodial
/// user signing for their own balance.
pub fn encode_transfer(to: &str, amount: u64) -> Result<Vec<u8>, RelayError> {
    let mut call = Vec::with_capacity(4 + 32 * 2);
    call.extend_from_slice(&TRANSFER_SELECTOR);
    call.extend_from_slice(&address_word(to)?);
    call.extend_from_slice(&amount_word(amount));
    Ok(call)
}

/// `transferFrom(from, to, amount)` — used when the sender is an external
/// wallet and the relay executes as an allowance-approved third party.
pub fn encode_transfer_from(from: &str, to: &str, amount: u64) -> Result<Vec<u8>, RelayError> {
    let mut call = Vec::with_capacity(4 + 32 * 3);
    call.extend_from_slice(&TRANSFER_FROM_SELECTOR);
    call.extend_from_slice(&address_word(from)?);
    call.extend_from_slice(&address_word(to)?);
    call.extend_from_slice(&amount_word(amount));
    Ok(call)
}

/// `getNonce(owner)` — forwarder-tracked nonce view call.
pub fn encode_get_nonce(owner: &str) -> Result<Vec<u8>, RelayError> {
    let mut call = Vec::with_capacity(4 + 32);
    call.extend_from_slice(&GET_NONCE_SELECTOR);
    call.extend_from_slice(&address_word(owner)?);
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000aa";
    const BOB: &str = "0x00000000000000000000000000000000000000bb";

    #[test]
    fn test_encode_transfer_layout() {
        let call = encode_transfer(BOB, 1_000).unwrap();
        assert_eq!(call.len(), 4 + 64);
        assert_eq!(&call[..4], &TRANSFER_SELECTOR);
        // address right-aligned in the first word
        assert_eq!(call[4 + 31], 0xbb);
        // amount big-endian in the second word
        assert_eq!(&call[4 + 32 + 30..], &[0x03, 0xe8]);
    }

    #[test]
    fn test_encode_transfer_from_layout() {
        let call = encode_transfer_from(ALICE, BOB, 7).unwrap();
        assert_eq!(call.len(), 4 + 96);
        assert_eq!(&call[..4], &TRANSFER_FROM_SELECTOR);
        assert_eq!(call[4 + 31], 0xaa);
        assert_eq!(call[4 + 32 + 31], 0xbb);
        assert_eq!(call[4 + 64 + 31], 0x07);
    }

    #[test]
    fn test_encode_get_nonce() {
        let call = encode_get_nonce(ALICE).unwrap();
        assert_eq!(call.len(), 4 + 32);
        assert_eq!(&call[..4], &GET_NONCE_SELECTOR);
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(encode_transfer("0x1234", 1).is_err());
        assert!(encode_transfer("not-hex", 1).is_err());
        assert!(encode_get_nonce("0xzz000000000000000000000000000000000000zz").is_err());
    }
}
