//! Health check handler

use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiResult, HealthData, ok};

/// Health/info endpoint
///
/// Reports the relay executor address and the configured chain. No internal
/// dependency details are exposed.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthData)
    ),
    tag = "System"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthData> {
    ok(HealthData {
        relayer_address: state.signer.relayer_address(),
        chain_id: state.chain_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    })
}
