//! Injected chain provider
//!
//! The contract layer never talks to a node directly; it is handed a
//! [`Provider`]. [`HttpProvider`] is the JSON-RPC implementation.

use crate::contract::ContractError;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read access to a chain
#[async_trait]
pub trait Provider: Send + Sync {
    /// Chain the provider is connected to
    async fn chain_id(&self) -> Result<u64, ContractError>;

    /// `eth_call` against the latest block
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ContractError>;
}

/// JSON-RPC over HTTP
pub struct HttpProvider {
    client: Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(rpc_url: impl Into<String>, timeout_secs: u64) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn request(&self, method: &'static str, params: Value) -> Result<Value, ContractError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContractError::Timeout
                } else if e.is_connect() {
                    ContractError::Unavailable
                } else {
                    ContractError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ContractError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let rpc: RpcResponse = response.json().await?;
        rpc.into_result()
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn chain_id(&self) -> Result<u64, ContractError> {
        let result = self.request("eth_chainId", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| ContractError::Decode(format!("eth_chainId returned {}", result)))?;
        parse_quantity(hex)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ContractError> {
        let result = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        serde_json::from_value(result).map_err(|e| ContractError::Decode(e.to_string()))
    }
}

/// `0x`-prefixed hex quantity
fn parse_quantity(hex: &str) -> Result<u64, ContractError> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    u64::from_str_radix(digits, 16)
        .map_err(|_| ContractError::Decode(format!("invalid quantity {}", hex)))
}

// ============================================
// JSON-RPC envelope
// ============================================

#[derive(Debug, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self) -> Result<Value, ContractError> {
        if let Some(err) = self.error {
            return Err(ContractError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| ContractError::Decode("missing result".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x2105").unwrap(), 8453);
        assert_eq!(parse_quantity("0x14a34").unwrap(), 84532);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_rpc_error_body() {
        let rpc: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        }))
        .unwrap();

        match rpc.into_result() {
            Err(ContractError::Rpc { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "execution reverted");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_result_decodes_as_bytes() {
        let value = json!("0x0000000000000000000000000000000000000000000000000000000000000001");
        let bytes: Bytes = serde_json::from_value(value).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
    }
}
