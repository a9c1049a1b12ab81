//! Relay Error Types
//!
//! One taxonomy for the whole engine: validation errors are rejected at the
//! boundary and never enter the state machine; settlement rejections map to
//! machine events; infrastructure errors propagate as-is and abort only the
//! current phase invocation.

use thiserror::Error;

/// Relay error types
///
/// Error codes are stable strings used in API responses.
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    // === Validation Errors (boundary-only) ===
    #[error("Invalid transfer intent: {0}")]
    InvalidIntent(String),

    #[error("Intent token rejected: {0}")]
    Unauthorized(String),

    #[error("Missing sender information")]
    MissingSender,

    #[error("Missing receiver information")]
    MissingReceiver,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Duplicate transfer intent: {0}")]
    DuplicateRecord(String),

    // === Lookup Errors ===
    #[error("Transfer not found: {0}")]
    RecordNotFound(String),

    // === Infrastructure Errors ===
    #[error("Intake queue is full")]
    QueueFull,

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Settlement network error: {0}")]
    Chain(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Internal system error: {0}")]
    System(String),
}

impl RelayError {
    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidIntent(_) => "INVALID_INTENT",
            RelayError::Unauthorized(_) => "UNAUTHORIZED",
            RelayError::MissingSender => "MISSING_SENDER",
            RelayError::MissingReceiver => "MISSING_RECEIVER",
            RelayError::InvalidAmount => "INVALID_AMOUNT",
            RelayError::DuplicateRecord(_) => "DUPLICATE_REQUEST",
            RelayError::RecordNotFound(_) => "TRANSFER_NOT_FOUND",
            RelayError::QueueFull => "QUEUE_FULL",
            RelayError::Store(_) => "STORE_ERROR",
            RelayError::Chain(_) => "CHAIN_ERROR",
            RelayError::Signer(_) => "SIGNER_ERROR",
            RelayError::System(_) => "SYSTEM_ERROR",
        }
    }

    /// HTTP status code suggestion for the gateway
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::Unauthorized(_) => 401,
            RelayError::InvalidIntent(_)
            | RelayError::MissingSender
            | RelayError::MissingReceiver
            | RelayError::InvalidAmount => 400,
            RelayError::DuplicateRecord(_) => 409,
            RelayError::RecordNotFound(_) => 404,
            RelayError::QueueFull => 503,
            RelayError::Store(_) | RelayError::Signer(_) | RelayError::System(_) => 500,
            RelayError::Chain(_) => 502,
        }
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        RelayError::Store(e.to_string())
    }
}

impl From<anyhow::Error> for RelayError {
    fn from(e: anyhow::Error) -> Self {
        RelayError::System(e.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Chain(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for RelayError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        RelayError::Unauthorized(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RelayError::MissingSender.code(), "MISSING_SENDER");
        assert_eq!(
            RelayError::DuplicateRecord("jti-1".into()).code(),
            "DUPLICATE_REQUEST"
        );
        assert_eq!(RelayError::Chain("rpc down".into()).code(), "CHAIN_ERROR");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(RelayError::Unauthorized("bad sig".into()).http_status(), 401);
        assert_eq!(RelayError::InvalidAmount.http_status(), 400);
        assert_eq!(RelayError::DuplicateRecord("x".into()).http_status(), 409);
        assert_eq!(RelayError::RecordNotFound("x".into()).http_status(), 404);
        assert_eq!(RelayError::Chain("x".into()).http_status(), 502);
        assert_eq!(RelayError::QueueFull.http_status(), 503);
    }

    #[test]
    fn test_display() {
        let err = RelayError::InvalidAmount;
        assert_eq!(err.to_string(), "Amount must be greater than zero");
    }
}
