// JSON-RPC chain client

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("RPC error: {message} ({code})")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed RPC response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Raw log entry as returned by `eth_getLogs`. Quantities stay hex-encoded
/// until the event layer decodes them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: String,
    pub transaction_hash: String,
    pub log_index: String,
}

/// Log query over an inclusive block range. `topic1`/`topic2` filter on
/// indexed event arguments; `None` is a wildcard.
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: B256,
    pub topic1: Option<B256>,
    pub topic2: Option<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

/// Read surface of the chain, kept behind a trait so the fetch pipeline is
/// testable without a network.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn block_number(&self) -> Result<u64, ChainError>;
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError>;
    /// Timestamp of a block, Unix seconds.
    async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError>;
    /// `eth_call` against the latest block, returning the raw return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError>;
}

pub struct ChainClient {
    http: HttpClient,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            http: HttpClient::builder()
                .timeout(RPC_TIMEOUT)
                .build()
                .unwrap_or_else(|_| HttpClient::new()),
            rpc_url,
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self.http.post(&self.rpc_url).json(&payload).send().await?;
        let rpc_resp: RpcResponse<T> = resp.json().await?;

        if let Some(error) = rpc_resp.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_resp
            .result
            .ok_or_else(|| ChainError::InvalidResponse(format!("no result for {}", method)))
    }

    /// Submit a transaction via `eth_sendTransaction`. The RPC endpoint (or
    /// an attached wallet service) holds the key for `from`.
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Vec<u8>,
    ) -> Result<String, ChainError> {
        let params = json!([{
            "from": format!("{from:#x}"),
            "to": format!("{to:#x}"),
            "data": format!("0x{}", hex::encode(data)),
        }]);
        self.request::<String>("eth_sendTransaction", params).await
    }
}

#[async_trait]
impl ChainSource for ChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let raw: String = self.request("eth_blockNumber", json!([])).await?;
        parse_hex_quantity(&raw)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
        let mut topics = vec![Value::String(format!("{:#x}", filter.topic0))];
        if filter.topic1.is_some() || filter.topic2.is_some() {
            topics.push(match filter.topic1 {
                Some(t) => Value::String(format!("{t:#x}")),
                None => Value::Null,
            });
        }
        if let Some(t) = filter.topic2 {
            topics.push(Value::String(format!("{t:#x}")));
        }

        let params = json!([{
            "address": format!("{:#x}", filter.address),
            "topics": topics,
            "fromBlock": format!("{:#x}", filter.from_block),
            "toBlock": format!("{:#x}", filter.to_block),
        }]);
        self.request("eth_getLogs", params).await
    }

    async fn block_timestamp(&self, block: u64) -> Result<i64, ChainError> {
        #[derive(Deserialize)]
        struct BlockHeader {
            timestamp: String,
        }

        let header: BlockHeader = self
            .request("eth_getBlockByNumber", json!([format!("{block:#x}"), false]))
            .await?;
        Ok(parse_hex_quantity(&header.timestamp)? as i64)
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([{
            "to": format!("{to:#x}"),
            "data": format!("0x{}", hex::encode(data)),
        }, "latest"]);
        let raw: String = self.request("eth_call", params).await?;
        hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| ChainError::InvalidResponse(format!("bad call return: {}", e)))
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_hex_quantity(raw: &str) -> Result<u64, ChainError> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad hex quantity {:?}: {}", raw, e)))
}
