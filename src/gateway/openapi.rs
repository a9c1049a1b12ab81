//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::types::{
    HealthData, TransferAcceptedData, TransferStatusData, TransferSubmitRequest,
    TransferSummaryData, WalletData,
};

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Token Relay API",
        version = "0.1.0",
        description = "Custodial meta-transaction relay for a fungible token: \
            gas-sponsored transfers submitted on behalf of users, tracked to finality.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::transfer::submit_transfer,
        crate::gateway::handlers::status::transfer_status,
        crate::gateway::handlers::status::user_transfers,
        crate::gateway::handlers::wallet::wallet_address,
        crate::gateway::handlers::health::health,
    ),
    components(schemas(
        TransferSubmitRequest,
        TransferAcceptedData,
        TransferStatusData,
        TransferSummaryData,
        WalletData,
        HealthData,
    )),
    tags(
        (name = "Transfer", description = "Transfer intake and status"),
        (name = "Wallet", description = "Custodial wallet lookups"),
        (name = "System", description = "Health and diagnostics"),
    )
)]
pub struct ApiDoc;
