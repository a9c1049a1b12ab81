//! Transfer intake handler

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::warn;

use super::super::auth::decode_intent;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferAcceptedData, TransferSubmitRequest, ok};
use crate::relay::machine::TxState;
use crate::relay::store::RecordStore;

/// Submit a transfer intent
///
/// Decodes and validates the signed intent, rejects duplicates
/// synchronously, and hands the intent to the asynchronous intake path.
/// The transfer itself settles later; poll the status endpoint with the
/// returned id.
#[utoipa::path(
    post,
    path = "/api/transfer",
    request_body = TransferSubmitRequest,
    responses(
        (status = 200, description = "Intent accepted (or duplicate, with success=false)", body = TransferAcceptedData),
        (status = 400, description = "Malformed intent"),
        (status = 401, description = "Intent token rejected"),
        (status = 503, description = "Intake queue full")
    ),
    tag = "Transfer"
)]
pub async fn submit_transfer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferSubmitRequest>,
) -> ApiResult<TransferAcceptedData> {
    let intent = match decode_intent(&req.jwt, &state.jwt_secret, &state.issuer) {
        Ok(intent) => intent,
        Err(err) => return ApiError::from(err).into_err(),
    };

    // Duplicate ids are rejected here, synchronously, before anything is
    // enqueued; only an aborted record may be superseded.
    match state.store.get(&intent.jti).await {
        Ok(Some(existing)) if !existing.machine.matches(TxState::Aborted) => {
            warn!(tx_id = %intent.jti, state = %existing.machine.state, "repeated transfer intent");
            return ok(TransferAcceptedData {
                success: false,
                id: None,
            });
        }
        Ok(_) => {}
        Err(err) => return ApiError::from(err).into_err(),
    }

    if let Err(err) = state.intake.try_enqueue(intent.clone()) {
        return ApiError::from(err).into_err();
    }

    ok(TransferAcceptedData {
        success: true,
        id: Some(intent.jti),
    })
}
