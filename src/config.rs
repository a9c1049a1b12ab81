use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL for records and locks; absent in mock runs
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Intake channel capacity
    pub queue_size: usize,
}

/// Relay engine tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    /// Retry ceiling before a failed transfer is permanently aborted
    pub max_retries: u32,
    /// Confirmations required before a submission counts as mined
    pub confirmations: u64,
    /// Submission gas price as a percentage of the network quote
    pub gas_premium_percent: u64,
    /// Phase locks older than this are treated as released
    pub lock_stale_secs: u64,
    /// Reconciliation cadence
    pub scan_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            confirmations: 1,
            gas_premium_percent: 120,
            lock_stale_secs: 300,
            scan_interval_secs: 60,
        }
    }
}

/// Settlement network endpoints and contract addresses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Fungible token contract the encoded calls target
    pub token_address: String,
    /// Forwarder contract that verifies and executes meta-transactions
    pub forwarder_address: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            token_address: "0x0000000000000000000000000000000000000010".to_string(),
            forwarder_address: "0x0000000000000000000000000000000000000020".to_string(),
        }
    }
}

/// Intent-token verification and custodial key material.
///
/// `jwt_secret` and `signer_seed` are secrets; the YAML values are dev
/// defaults and the `JWT_SECRET` / `SEED` environment variables override
/// them in every other environment.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    /// Hex-encoded 32-byte root seed for the custodial keyspace
    pub signer_seed: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret".to_string(),
            issuer: "relay.example.org".to_string(),
            signer_seed: "0101010101010101010101010101010101010101010101010101010101010101"
                .to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        let mut config: AppConfig =
            serde_yaml::from_str(&content).expect("Failed to parse config yaml");
        config.apply_env_overrides();
        config
    }

    /// Secrets come from the environment when present.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(seed) = std::env::var("SEED") {
            self.auth.signer_seed = seed;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres_url = Some(url);
        }
    }
}
