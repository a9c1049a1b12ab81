//! Wallet address handler

use std::sync::Arc;

use axum::extract::{Path, State};

use super::super::state::AppState;
use super::super::types::{ApiResult, WalletData, ok};

/// Derived custodial address for an internal user
#[utoipa::path(
    get,
    path = "/api/wallet/{user_id}",
    params(("user_id" = u64, Path, description = "Internal user id")),
    responses(
        (status = 200, description = "Derived wallet address", body = WalletData)
    ),
    tag = "Wallet"
)]
pub async fn wallet_address(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> ApiResult<WalletData> {
    ok(WalletData {
        user_id,
        address: state.signer.address_for(user_id),
    })
}
