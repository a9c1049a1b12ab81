//! HTTP Settlement Client
//!
//! JSON-RPC client for the settlement network's relay endpoint. Submission
//! goes through the gas-sponsored `relay_sendTransaction` method; reads use
//! the standard `eth_*` surface. Quantities travel as 0x-prefixed hex.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::abi::encode_get_nonce;
use super::client::{Receipt, SettlementClient, SignedForward, WaitOutcome};
use crate::config::ChainConfig;
use crate::relay::error::RelayError;

/// Receipt polling cadence inside `wait`
const WAIT_POLL_MS: u64 = 2_000;
/// Polls before giving up and deferring to the confirmation watcher
const WAIT_MAX_POLLS: u32 = 45;

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Call object for `eth_call` / `eth_estimateGas`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    to: String,
    data: String,
}

/// Relay submission object for `relay_sendTransaction`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayTxParams {
    from: String,
    to: String,
    value: String,
    gas: String,
    gas_price: String,
    nonce: String,
    data: String,
    schedule: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelaySubmission {
    relay_transaction_hash: String,
}

/// Transaction receipt from RPC
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: String,
    status: String,
    #[serde(default)]
    logs: Vec<serde_json::Value>,
}

pub struct HttpSettlement {
    config: ChainConfig,
    client: reqwest::Client,
}

impl HttpSettlement {
    pub fn new(config: ChainConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::Chain(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Make a JSON-RPC call whose result may legitimately be null
    /// (e.g. the receipt of an unmined transaction).
    async fn rpc_call_opt<T, R>(
        &self,
        method: &'static str,
        params: T,
    ) -> Result<Option<R>, RelayError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Chain(format!("HTTP request failed: {}", e)))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| RelayError::Chain(format!("failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(RelayError::Chain(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        Ok(rpc_response.result)
    }

    /// Make a JSON-RPC call that must produce a result
    async fn rpc_call<T, R>(&self, method: &'static str, params: T) -> Result<R, RelayError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        self.rpc_call_opt(method, params)
            .await?
            .ok_or_else(|| RelayError::Chain("no result in RPC response".to_string()))
    }

    async fn block_number(&self) -> Result<u64, RelayError> {
        let result: String = self.rpc_call("eth_blockNumber", ()).await?;
        parse_hex_u64(&result)
    }
}

#[async_trait]
impl SettlementClient for HttpSettlement {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn gas_price(&self) -> Result<u128, RelayError> {
        let result: String = self.rpc_call("eth_gasPrice", ()).await?;
        parse_hex_u128(&result)
    }

    async fn estimate_gas(&self, from: &str, to: &str, data: &[u8]) -> Result<u64, RelayError> {
        let params = CallParams {
            from: Some(from.to_string()),
            to: to.to_string(),
            data: format!("0x{}", hex::encode(data)),
        };
        let result: String = self.rpc_call("eth_estimateGas", (params,)).await?;
        parse_hex_u64(&result)
    }

    async fn submit(
        &self,
        call: &SignedForward,
        gas_price: u128,
        gas_limit: u64,
    ) -> Result<String, RelayError> {
        let params = RelayTxParams {
            from: call.request.from.clone(),
            to: call.request.to.clone(),
            value: format!("0x{:x}", call.request.value),
            gas: format!("0x{:x}", gas_limit),
            gas_price: format!("0x{:x}", gas_price),
            nonce: format!("0x{:x}", call.request.nonce),
            data: format!("0x{}", hex::encode(&call.request.data)),
            schedule: "fast",
        };
        let signature = format!("0x{}", hex::encode(&call.signature));

        let result: RelaySubmission = self
            .rpc_call("relay_sendTransaction", (params, signature))
            .await?;
        Ok(result.relay_transaction_hash)
    }

    async fn wait(&self, submit_hash: &str, confirmations: u64) -> Result<WaitOutcome, RelayError> {
        for poll in 0..WAIT_MAX_POLLS {
            match self.receipt(submit_hash).await {
                Ok(Some(receipt)) if receipt.confirmations >= confirmations => {
                    debug!(hash = %submit_hash, block = receipt.block_number, "submission confirmed");
                    return Ok(WaitOutcome::Confirmed(receipt));
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(hash = %submit_hash, poll, error = %err, "receipt poll failed, retrying");
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(WAIT_POLL_MS)).await;
        }
        Ok(WaitOutcome::RetryLater)
    }

    async fn receipt(&self, hash: &str) -> Result<Option<Receipt>, RelayError> {
        let result: Option<RpcReceipt> = self
            .rpc_call_opt("eth_getTransactionReceipt", (hash,))
            .await?;
        let Some(rpc) = result else {
            return Ok(None);
        };

        let block_number = parse_hex_u64(&rpc.block_number)?;
        let latest = self.block_number().await?;
        let confirmations = latest.saturating_sub(block_number) + 1;

        Ok(Some(Receipt {
            tx_hash: rpc.transaction_hash,
            block_number,
            status: parse_hex_u64(&rpc.status)? == 1,
            confirmations,
            log_count: rpc.logs.len(),
        }))
    }

    async fn forwarder_nonce(&self, owner: &str) -> Result<u64, RelayError> {
        let call = encode_get_nonce(owner)?;
        let params = CallParams {
            from: None,
            to: self.config.forwarder_address.clone(),
            data: format!("0x{}", hex::encode(call)),
        };
        let result: String = self.rpc_call("eth_call", (params, "latest")).await?;
        parse_hex_u64(&result)
    }
}

/// Parse a 0x-prefixed hex quantity, tolerating wide zero-padded words.
fn parse_hex_u64(value: &str) -> Result<u64, RelayError> {
    let trimmed = value.trim_start_matches("0x").trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 16)
        .map_err(|e| RelayError::Chain(format!("invalid hex quantity {}: {}", value, e)))
}

fn parse_hex_u128(value: &str) -> Result<u128, RelayError> {
    let trimmed = value.trim_start_matches("0x").trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(trimmed, 16)
        .map_err(|e| RelayError::Chain(format!("invalid hex quantity {}: {}", value, e)))
}
