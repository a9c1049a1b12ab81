//! Shared Gateway State

use std::sync::Arc;

use crate::chain::signer::SignerProvider;
use crate::dispatch::IntakeSender;
use crate::relay::RelayContext;
use crate::relay::store::RecordStore;

/// State shared by every handler.
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub signer: Arc<SignerProvider>,
    /// Hand-off channel to the intake task
    pub intake: IntakeSender,
    /// Engine context, used by the on-demand reconcile trigger
    pub relay_ctx: Arc<RelayContext>,
    /// Intent-token secret and issuer
    pub jwt_secret: String,
    pub issuer: String,
    pub chain_id: u64,
}
