//! HTTP Gateway
//!
//! Thin boundary over the relay engine: intent intake, status lookups,
//! wallet derivation, health. All pipeline errors stay inside the engine;
//! callers only ever see the initial validation outcome and the public
//! status mapping.

pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

/// Assemble the gateway router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/transfer", post(handlers::submit_transfer))
        .route("/transfer/user/{user_id}", get(handlers::user_transfers))
        .route("/transfer/{id}", get(handlers::transfer_status))
        .route("/wallet/{user_id}", get(handlers::wallet_address));

    let router = Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()));

    // Dev-only trigger; compiled out of production builds.
    #[cfg(feature = "mock-api")]
    let router = router.route("/process", post(handlers::run_process));

    router.with_state(state)
}

/// Bind and serve until shutdown.
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = TcpListener::bind((host, port)).await?;
    info!(host, port, "gateway listening");
    axum::serve(listener, router).await?;
    Ok(())
}
