//! Intent Token Handling
//!
//! Transfer intents arrive as HS256 JWTs issued by the application backend.
//! The claim set carries the idempotency id (`jti`), the amount, and the
//! dual sender/receiver representation: `*_user_id` for internal custodial
//! users, `*_wallet` for external addresses. Exactly one of each pair must
//! be present; when both appear the internal representation wins.
//!
//! The status endpoint answers with a freshly signed receipt token so the
//! issuing backend can verify the response came from this service.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::relay::error::RelayError;
use crate::relay::types::{PartyRef, TransferIntent};

/// Claim set of an inbound transfer-intent token
#[derive(Debug, Deserialize)]
pub struct IntentClaims {
    pub jti: String,
    pub amount: u64,
    pub from_user_id: Option<u64>,
    pub from_wallet: Option<String>,
    pub to_user_id: Option<u64>,
    pub to_wallet: Option<String>,
}

/// Claim set of an outbound status-receipt token
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptClaims {
    pub iss: String,
    pub jti: String,
    pub iat: i64,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Decode and structurally validate a transfer-intent token.
pub fn decode_intent(
    token: &str,
    secret: &str,
    issuer: &str,
) -> Result<TransferIntent, RelayError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    // Intents are issued without an expiry; the jti is the replay guard.
    validation.set_required_spec_claims(&["iss", "jti"]);
    validation.validate_exp = false;

    let claims =
        decode::<IntentClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?
            .claims;

    if claims.amount == 0 {
        return Err(RelayError::InvalidAmount);
    }
    let sender = PartyRef::from_parts(
        claims.from_user_id.map(|id| id as i64),
        claims.from_user_id.is_none().then_some(claims.from_wallet).flatten(),
    )
    .ok_or(RelayError::MissingSender)?;
    let receiver = PartyRef::from_parts(
        claims.to_user_id.map(|id| id as i64),
        claims.to_user_id.is_none().then_some(claims.to_wallet).flatten(),
    )
    .ok_or(RelayError::MissingReceiver)?;

    Ok(TransferIntent {
        jti: claims.jti,
        sender,
        receiver,
        amount: claims.amount,
    })
}

/// Sign a status receipt for the given transfer.
pub fn sign_receipt(
    secret: &str,
    issuer: &str,
    jti: &str,
    status: &str,
    message: &str,
    hash: Option<String>,
) -> Result<String, RelayError> {
    let claims = ReceiptClaims {
        iss: issuer.to_string(),
        jti: jti.to_string(),
        iat: Utc::now().timestamp(),
        status: status.to_string(),
        message: message.to_string(),
        hash,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}
