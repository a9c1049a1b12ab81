//! On-demand reconcile trigger (dev builds only)

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, ok};
use crate::relay::reconcile::reconcile;

/// Cycle summary returned by the dev trigger
#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessData {
    pub submitted: usize,
    pub confirmed: usize,
    pub requeued: usize,
    pub errored: usize,
    pub frozen_senders: usize,
}

/// Run one reconciliation cycle immediately.
pub async fn run_process(State(state): State<Arc<AppState>>) -> ApiResult<ProcessData> {
    match reconcile(&state.relay_ctx).await {
        Ok(report) => ok(ProcessData {
            submitted: report.pending.advanced,
            confirmed: report.processing.advanced,
            requeued: report.failed.advanced,
            errored: report.pending.errored + report.processing.errored,
            frozen_senders: report.frozen_senders,
        }),
        Err(err) => ApiError::from(err).into_err(),
    }
}
