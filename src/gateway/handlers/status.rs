//! Transfer status handler

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::auth::sign_receipt;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferStatusData, TransferSummaryData, ok};
use crate::relay::machine::TxState;
use crate::relay::store::RecordStore;
use crate::relay::types::PartyRef;

/// Fetch a transfer's public status
///
/// Maps the machine state onto the three public statuses and wraps the
/// answer in a signed receipt token. Pipeline errors are never surfaced
/// beyond this mapping.
#[utoipa::path(
    get,
    path = "/api/transfer/{id}",
    params(("id" = String, Path, description = "Transfer idempotency id")),
    responses(
        (status = 200, description = "Current transfer status", body = TransferStatusData),
        (status = 404, description = "Unknown transfer id")
    ),
    tag = "Transfer"
)]
pub async fn transfer_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<TransferStatusData> {
    let record = match state.store.get(&id).await {
        Ok(Some(record)) => record,
        Ok(None) => return ApiError::not_found(format!("transfer {} not found", id)).into_err(),
        Err(err) => return ApiError::from(err).into_err(),
    };

    let (status, message) = match record.machine.state {
        TxState::Success => ("SUCCESS", "Transfer confirmed on chain"),
        TxState::Aborted => ("ERROR", "Transfer permanently aborted"),
        _ => ("WAITING", "Transfer in processing"),
    };
    let hash = record
        .machine
        .tx_hash
        .clone()
        .or_else(|| record.machine.submit_hash.clone());

    let token = match sign_receipt(&state.jwt_secret, &state.issuer, &id, status, message, hash.clone())
    {
        Ok(token) => token,
        Err(err) => return ApiError::from(err).into_err(),
    };

    ok(TransferStatusData {
        id,
        status: status.to_string(),
        message: message.to_string(),
        hash,
        token,
    })
}

/// List an internal user's transfers, nonce ascending
#[utoipa::path(
    get,
    path = "/api/transfer/user/{user_id}",
    params(("user_id" = u64, Path, description = "Internal user id")),
    responses(
        (status = 200, description = "Transfers sent by this user", body = [TransferSummaryData])
    ),
    tag = "Transfer"
)]
pub async fn user_transfers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> ApiResult<Vec<TransferSummaryData>> {
    let records = match state.store.for_sender(&PartyRef::Internal(user_id)).await {
        Ok(records) => records,
        Err(err) => return ApiError::from(err).into_err(),
    };

    ok(records
        .into_iter()
        .map(|r| TransferSummaryData {
            id: r.id,
            state: r.machine.state.as_str().to_string(),
            amount: r.amount,
            nonce: r.nonce,
            hash: r.machine.tx_hash.or(r.machine.submit_hash),
            created_at: r.created_at,
        })
        .collect())
}
