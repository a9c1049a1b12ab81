//! token_relay - Custodial Meta-Transaction Relay
//!
//! Entry point. Architecture:
//!
//! ```text
//! ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌─────────────┐
//! │ Gateway │───▶│ Dispatch │───▶│  Intake  │───▶│ RecordStore │
//! │ (axum)  │    │  (mpsc)  │    │ (create) │    │ (postgres)  │
//! └─────────┘    └──────────┘    └──────────┘    └──────┬──────┘
//!                                                       │
//!                   ┌───────────────────────────────────┘
//!                   ▼
//!             ┌───────────┐    ┌───────────────────────┐
//!             │  Worker   │───▶│ pending/confirm/retry │───▶ settlement
//!             │ (reconcile)│   │   phase processors    │      network
//!             └───────────┘    └───────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use token_relay::chain::client::SettlementClient;
use token_relay::chain::signer::SignerProvider;
use token_relay::config::AppConfig;
use token_relay::dispatch::{intake_channel, run_intake_loop};
use token_relay::gateway::{self, state::AppState};
use token_relay::relay::db::PgStore;
use token_relay::relay::locks::LockManager;
use token_relay::relay::store::{LockStore, RecordStore};
use token_relay::relay::worker::{RelayWorker, WorkerConfig};
use token_relay::relay::{IntakeService, RelayContext};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

/// Build the record and lock stores from config.
async fn build_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn RecordStore>, Arc<dyn LockStore>)> {
    if let Some(url) = &config.postgres_url {
        let store = PgStore::connect(url).await.context("postgres connect")?;
        store.ensure_schema().await.context("postgres schema")?;
        let store = Arc::new(store);
        let records: Arc<dyn RecordStore> = store.clone();
        let locks: Arc<dyn LockStore> = store;
        return Ok((records, locks));
    }

    #[cfg(feature = "mock-api")]
    {
        tracing::warn!("no postgres_url configured; using in-memory store (mock-api)");
        let store = Arc::new(token_relay::relay::memory::MemoryStore::new());
        let records: Arc<dyn RecordStore> = store.clone();
        let locks: Arc<dyn LockStore> = store;
        return Ok((records, locks));
    }

    #[cfg(not(feature = "mock-api"))]
    {
        anyhow::bail!("postgres_url is required outside mock-api builds");
    }
}

/// Build the settlement client from config.
fn build_chain(config: &AppConfig) -> anyhow::Result<Arc<dyn SettlementClient>> {
    if !config.chain.rpc_url.is_empty() {
        return Ok(Arc::new(token_relay::chain::http::HttpSettlement::new(
            config.chain.clone(),
        )?));
    }

    #[cfg(feature = "mock-api")]
    {
        tracing::warn!("no rpc_url configured; using mock settlement network (mock-api)");
        return Ok(Arc::new(token_relay::chain::mock::MockChain::new(
            config.chain.chain_id,
        )));
    }

    #[cfg(not(feature = "mock-api"))]
    {
        anyhow::bail!("chain.rpc_url is required outside mock-api builds");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env);
    let _log_guard = token_relay::logging::init_logging(&config);

    tracing::info!(env = %env, "starting token_relay");

    let signer = Arc::new(
        SignerProvider::from_seed_hex(&config.auth.signer_seed).context("signer seed")?,
    );
    let (record_store, lock_store) = build_stores(&config).await?;
    let chain = build_chain(&config)?;

    let relay_ctx = Arc::new(RelayContext {
        store: record_store.clone(),
        locks: LockManager::new(
            lock_store,
            Duration::from_secs(config.relay.lock_stale_secs),
        ),
        chain,
        signer: signer.clone(),
        cfg: config.relay.clone(),
    });

    // Intake: the gateway enqueues, this loop creates records.
    let intake_service = Arc::new(IntakeService::new(
        record_store.clone(),
        signer.clone(),
        config.chain.token_address.clone(),
    ));
    let (intake_tx, intake_rx) = intake_channel(config.gateway.queue_size);
    tokio::spawn(run_intake_loop(intake_rx, intake_service));

    // Periodic reconciliation.
    let worker = RelayWorker::new(
        relay_ctx.clone(),
        WorkerConfig {
            scan_interval: Duration::from_secs(config.relay.scan_interval_secs),
        },
    );
    tokio::spawn(async move { worker.run().await });

    tracing::info!(
        relayer = %signer.relayer_address(),
        chain_id = config.chain.chain_id,
        "relay engine online"
    );

    let state = Arc::new(AppState {
        store: record_store,
        signer,
        intake: intake_tx,
        relay_ctx,
        jwt_secret: config.auth.jwt_secret.clone(),
        issuer: config.auth.issuer.clone(),
        chain_id: config.chain.chain_id,
    });

    let port = get_port_override().unwrap_or(config.gateway.port);
    gateway::serve(state, &config.gateway.host, port).await
}
