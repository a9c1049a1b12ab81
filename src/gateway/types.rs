//! API Response types and error codes
//!
//! - `ApiResponse<T>`: unified response wrapper (code / msg / data)
//! - `ApiError`: gateway-side error with HTTP status mapping
//! - Request/response DTOs for the relay endpoints

use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::relay::error::RelayError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }
}

/// Handler result: success tuple or error tuple, both ready for axum.
pub type ApiResult<T> =
    Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

/// Create a success response
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_INTENT: i32 = 1001;
    pub const DUPLICATE_REQUEST: i32 = 1009;

    // Auth errors (2xxx)
    pub const AUTH_FAILED: i32 = 2002;

    // Resource errors (4xxx)
    pub const TRANSFER_NOT_FOUND: i32 = 4004;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const CHAIN_ERROR: i32 = 5002;
}

/// Gateway error carrying an HTTP status and a wire code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: error_codes::TRANSFER_NOT_FOUND,
            msg: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: error_codes::INTERNAL_ERROR,
            msg: msg.into(),
        }
    }

    /// Convert into the handler error tuple.
    pub fn into_err<T>(self) -> ApiResult<T> {
        Err((
            self.status,
            Json(ApiResponse {
                code: self.code,
                msg: self.msg,
                data: None,
            }),
        ))
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match err {
            RelayError::Unauthorized(_) => error_codes::AUTH_FAILED,
            RelayError::DuplicateRecord(_) => error_codes::DUPLICATE_REQUEST,
            RelayError::RecordNotFound(_) => error_codes::TRANSFER_NOT_FOUND,
            RelayError::QueueFull => error_codes::SERVICE_UNAVAILABLE,
            RelayError::Chain(_) => error_codes::CHAIN_ERROR,
            RelayError::Store(_) | RelayError::Signer(_) | RelayError::System(_) => {
                error_codes::INTERNAL_ERROR
            }
            _ => error_codes::INVALID_INTENT,
        };
        Self {
            status,
            code,
            msg: err.to_string(),
        }
    }
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// Transfer submission request: the signed intent token
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferSubmitRequest {
    /// Signed transfer-intent JWT issued by the application backend
    pub jwt: String,
}

/// Transfer acceptance response
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferAcceptedData {
    pub success: bool,
    /// Idempotency id of the accepted transfer; null on duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Public transfer status
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferStatusData {
    pub id: String,
    /// WAITING | SUCCESS | ERROR
    #[schema(example = "WAITING")]
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Signed receipt token echoing this status
    pub token: String,
}

/// One row of a user's transfer history
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferSummaryData {
    pub id: String,
    /// Machine state name (PENDING, PROCESSING, SUCCESS, FAILED, ABORTED)
    #[schema(example = "SUCCESS")]
    pub state: String,
    pub amount: u64,
    pub nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub created_at: i64,
}

/// Derived custodial wallet address
#[derive(Debug, Serialize, ToSchema)]
pub struct WalletData {
    pub user_id: u64,
    pub address: String,
}

/// Health/info response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthData {
    pub relayer_address: String,
    pub chain_id: u64,
    pub version: String,
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_wrapper_shape() {
        let json = serde_json::to_value(ApiResponse::success(5u32)).unwrap();
        assert_eq!(json["code"], 0);
        assert_eq!(json["msg"], "ok");
        assert_eq!(json["data"], 5);
    }

    #[test]
    fn test_relay_error_mapping() {
        let api: ApiError = RelayError::Unauthorized("bad".into()).into();
        assert_eq!(api.status, StatusCode::UNAUTHORIZED);
        assert_eq!(api.code, error_codes::AUTH_FAILED);

        let api: ApiError = RelayError::QueueFull.into();
        assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api.code, error_codes::SERVICE_UNAVAILABLE);

        let api: ApiError = RelayError::InvalidAmount.into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, error_codes::INVALID_INTENT);
    }
}
