//! JSON-RPC transport.
//!
//! Every request carries the configured timeout. Transport failures, timeouts,
//! 5xx responses and node error objects are retried a bounded number of times.
//! Reverts and client errors are returned immediately.
//!
//! A raw transaction hashes to the same id on every attempt, so resending it
//! after a lost response is safe. A node that reports the transaction as
//! already known is treated as having accepted it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{EthAddress, TxHash};
use privatepay_crypto::keccak256;

use crate::abi::{decode_hex_data, Log};

/// Delay before the first retry; doubles per attempt.
const RETRY_BASE_DELAY_MS: u64 = 200;

/// JSON-RPC error code nodes use for `execution reverted`.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// RPC client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Endpoint URL
    pub url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries for recoverable failures
    pub retries: u32,
}

impl RpcConfig {
    /// Configuration with default timeout and retries.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: 60_000,
            retries: 3,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorBody {
    fn into_error(self, method: &str) -> PrivatePayError {
        // Rejections of a signed transaction are final
        if method == "eth_sendRawTransaction" {
            return PrivatePayError::TransactionFailed(format!(
                "{} (code {})",
                self.message, self.code
            ));
        }
        let reverted = self.code == EXECUTION_REVERTED_CODE
            || self.message.to_ascii_lowercase().contains("revert");
        if reverted {
            let detail = self
                .data
                .map(|data| format!(" ({})", data))
                .unwrap_or_default();
            PrivatePayError::ContractError(format!("{}{}", self.message, detail))
        } else {
            PrivatePayError::RpcError(format!("{} (code {})", self.message, self.code))
        }
    }
}

/// Filter for `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract
    pub address: EthAddress,
    /// Topic 0
    pub topic0: [u8; 32],
    /// Optional topic 1 (e.g. an indexed recipient)
    pub topic1: Option<[u8; 32]>,
    /// First block, inclusive
    pub from_block: u64,
    /// Last block, inclusive
    pub to_block: u64,
}

impl LogFilter {
    fn to_json(&self) -> Value {
        let mut topics = vec![Value::String(hex_data(&self.topic0))];
        if let Some(topic1) = &self.topic1 {
            topics.push(Value::String(hex_data(topic1)));
        }
        json!({
            "address": self.address.to_lower_hex(),
            "topics": topics,
            "fromBlock": quantity(self.from_block as u128),
            "toBlock": quantity(self.to_block as u128),
        })
    }
}

/// Mined transaction as reported by `eth_getTransactionReceipt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: TxHash,
    /// Block that included the transaction
    pub block_number: u64,
    /// Gas consumed
    pub gas_used: u128,
    /// False when execution reverted
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl RawReceipt {
    /// `None` while the node still reports the transaction as pending.
    fn into_receipt(self) -> Result<Option<TransactionReceipt>> {
        let Some(block) = self.block_number else {
            return Ok(None);
        };
        Ok(Some(TransactionReceipt {
            transaction_hash: TxHash::from_hex(&self.transaction_hash)?,
            block_number: parse_quantity_u64(&block)?,
            gas_used: self.gas_used.as_deref().map_or(Ok(0), parse_quantity)?,
            // Receipts without a status field predate Byzantium and succeeded
            success: self.status.as_deref().map_or(Ok(1), parse_quantity)? == 1,
        }))
    }
}

/// JSON-RPC client over HTTP.
pub struct RpcClient {
    config: RpcConfig,
    http_client: reqwest::Client,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client with default timeout and retries.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_config(RpcConfig::new(url))
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: RpcConfig) -> Result<Self> {
        url::Url::parse(&config.url)
            .map_err(|e| PrivatePayError::config("rpc_url", e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| PrivatePayError::HttpError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Sends a request, retrying recoverable failures.
    #[instrument(skip(self, params), fields(url = %self.config.url))]
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(method, &params).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_recoverable() && attempt < self.config.retries => {
                    attempt += 1;
                    backoff(method, attempt, &e).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, method: &str, params: &Value) -> Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PrivatePayError::ConnectionTimeout(format!("{} timed out", method))
                } else {
                    PrivatePayError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // 5xx and rate limiting are transient; other 4xx mean a bad endpoint
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                PrivatePayError::RpcError(format!("{} returned HTTP {}", method, status))
            } else {
                PrivatePayError::config(
                    "rpc_url",
                    format!("{} returned HTTP {}", self.config.url, status),
                )
            });
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| PrivatePayError::HttpError(format!("invalid JSON-RPC body: {}", e)))?;

        if let Some(error) = body.error {
            debug!(method, code = error.code, "RPC error response");
            return Err(error.into_error(method));
        }

        Ok(body.result.unwrap_or(Value::Null))
    }

    /// `eth_chainId`
    pub async fn chain_id(&self) -> Result<u64> {
        let value = self.request("eth_chainId", json!([])).await?;
        parse_quantity_u64(as_str(&value, "eth_chainId")?)
    }

    /// `eth_blockNumber`
    pub async fn block_number(&self) -> Result<u64> {
        let value = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(as_str(&value, "eth_blockNumber")?)
    }

    /// `eth_getBalance` at the latest block.
    pub async fn get_balance(&self, address: &EthAddress) -> Result<u128> {
        let value = self
            .request("eth_getBalance", json!([address.to_lower_hex(), "latest"]))
            .await?;
        parse_quantity(as_str(&value, "eth_getBalance")?)
    }

    /// `eth_getTransactionCount` including pending transactions.
    pub async fn get_transaction_count(&self, address: &EthAddress) -> Result<u64> {
        let value = self
            .request(
                "eth_getTransactionCount",
                json!([address.to_lower_hex(), "pending"]),
            )
            .await?;
        parse_quantity_u64(as_str(&value, "eth_getTransactionCount")?)
    }

    /// `eth_gasPrice`
    pub async fn gas_price(&self) -> Result<u128> {
        let value = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(as_str(&value, "eth_gasPrice")?)
    }

    /// `eth_call` at the latest block.
    pub async fn call(&self, to: &EthAddress, data: &[u8]) -> Result<Vec<u8>> {
        let value = self
            .request(
                "eth_call",
                json!([{ "to": to.to_lower_hex(), "data": hex_data(data) }, "latest"]),
            )
            .await?;
        decode_hex_data(as_str(&value, "eth_call")?)
    }

    /// `eth_getLogs`
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>> {
        let value = self.request("eth_getLogs", json!([filter.to_json()])).await?;
        serde_json::from_value(value)
            .map_err(|e| PrivatePayError::RpcError(format!("malformed eth_getLogs result: {}", e)))
    }

    /// `eth_sendRawTransaction`
    ///
    /// When an earlier attempt may have reached the node, an "already known"
    /// or "nonce too low" reply means the transaction was accepted, and its
    /// locally computed hash is returned.
    #[instrument(skip(self, raw), fields(url = %self.config.url))]
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash> {
        const METHOD: &str = "eth_sendRawTransaction";
        let params = json!([hex_data(raw)]);
        let local_hash = TxHash::from_array(keccak256(raw));

        let mut attempt = 0u32;
        loop {
            match self.send_once(METHOD, &params).await {
                Ok(value) => return TxHash::from_hex(as_str(&value, METHOD)?),
                Err(PrivatePayError::TransactionFailed(msg))
                    if already_broadcast(&msg, attempt > 0) =>
                {
                    debug!(tx_hash = %local_hash, attempt, reply = %msg, "Already broadcast");
                    return Ok(local_hash);
                }
                Err(e) if e.is_recoverable() && attempt < self.config.retries => {
                    attempt += 1;
                    backoff(METHOD, attempt, &e).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// `eth_getTransactionReceipt`; `None` until the transaction is mined.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>> {
        let value = self
            .request("eth_getTransactionReceipt", json!([tx_hash.to_hex()]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(value).map_err(|e| {
            PrivatePayError::RpcError(format!("malformed eth_getTransactionReceipt result: {}", e))
        })?;
        raw.into_receipt()
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.config.url)
            .field("timeout_ms", &self.config.timeout_ms)
            .field("retries", &self.config.retries)
            .finish()
    }
}

async fn backoff(method: &str, attempt: u32, error: &PrivatePayError) {
    let delay = RETRY_BASE_DELAY_MS << (attempt - 1).min(6);
    warn!(method, attempt, delay_ms = delay, error = %error, "Retrying RPC request");
    tokio::time::sleep(Duration::from_millis(delay)).await;
}

/// Whether a send rejection means the node already holds the transaction.
///
/// "nonce too low" only counts after a resend, when the first attempt may
/// have been mined before its response was lost.
fn already_broadcast(message: &str, resent: bool) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already known")
        || message.contains("known transaction")
        || (resent && message.contains("nonce too low"))
}

fn as_str<'a>(value: &'a Value, method: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| PrivatePayError::RpcError(format!("{} returned {}", method, value)))
}

/// `0x`-prefixed lowercase hex.
pub fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encodes a JSON-RPC quantity (no leading zeros).
pub fn quantity(value: u128) -> String {
    format!("{:#x}", value)
}

/// Parses a JSON-RPC quantity.
pub fn parse_quantity(raw: &str) -> Result<u128> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| PrivatePayError::RpcError(format!("quantity {} lacks 0x prefix", raw)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| PrivatePayError::RpcError(format!("invalid quantity {}: {}", raw, e)))
}

/// Parses a JSON-RPC quantity that must fit in a `u64`.
pub fn parse_quantity_u64(raw: &str) -> Result<u64> {
    let value = parse_quantity(raw)?;
    u64::try_from(value)
        .map_err(|_| PrivatePayError::RpcError(format!("quantity {} overflows u64", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test_case("0x0", 0)]
    #[test_case("0x138b", 5003)]
    #[test_case("0xde0b6b3a7640000", 1_000_000_000_000_000_000)]
    fn test_parse_quantity(raw: &str, expected: u128) {
        assert_eq!(parse_quantity(raw).unwrap(), expected);
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert!(parse_quantity("138b").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert!(parse_quantity_u64(&quantity(u128::from(u64::MAX) + 1)).is_err());
    }

    #[test]
    fn test_quantity_encoding() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(5003), "0x138b");
    }

    fn client(server: &MockServer, retries: u32) -> RpcClient {
        RpcClient::with_config(RpcConfig {
            url: server.uri(),
            timeout_ms: 2_000,
            retries,
        })
        .unwrap()
    }

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    #[tokio::test]
    async fn test_chain_id_and_block_number() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_chainId" })))
            .respond_with(ok(json!("0x138b")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_blockNumber" })))
            .respond_with(ok(json!("0x1f4ab2e")))
            .mount(&server)
            .await;

        let rpc = client(&server, 0);
        assert_eq!(rpc.chain_id().await.unwrap(), 5003);
        assert_eq!(rpc.block_number().await.unwrap(), 0x1f4ab2e);
    }

    #[tokio::test]
    async fn test_revert_maps_to_contract_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": 3, "message": "execution reverted: Invalid index", "data": "0x" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .call(&EthAddress::from_array([1; 20]), &[0xde, 0xad])
            .await
            .unwrap_err();
        assert!(
            matches!(err, PrivatePayError::ContractError(msg) if msg.contains("Invalid index"))
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 2).gas_price().await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3).block_number().await.unwrap_err();
        assert!(matches!(err, PrivatePayError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_call_decodes_hex() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ok(json!("0x00ff")))
            .mount(&server)
            .await;

        let data = client(&server, 0)
            .call(&EthAddress::from_array([1; 20]), &[1, 2, 3, 4])
            .await
            .unwrap();
        assert_eq!(data, vec![0x00, 0xff]);
    }

    #[tokio::test]
    async fn test_send_raw_transaction() {
        let server = MockServer::start().await;
        let hash = format!("0x{}", "12".repeat(32));
        Mock::given(method("POST"))
            .and(body_partial_json(
                json!({ "method": "eth_sendRawTransaction", "params": ["0xf86c"] }),
            ))
            .respond_with(ok(json!(hash)))
            .mount(&server)
            .await;

        let tx_hash = client(&server, 0)
            .send_raw_transaction(&[0xf8, 0x6c])
            .await
            .unwrap();
        assert_eq!(tx_hash, TxHash::from_array([0x12; 32]));
    }

    #[tokio::test]
    async fn test_rejected_transaction_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "nonce too low" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 3)
            .send_raw_transaction(&[0xf8, 0x6c])
            .await
            .unwrap_err();
        assert!(
            matches!(&err, PrivatePayError::TransactionFailed(msg) if msg.contains("nonce too low"))
        );
        assert_eq!(err.code(), "TRANSACTION_FAILED");
    }

    fn send_error(message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": message }
        }))
    }

    #[tokio::test]
    async fn test_already_known_transaction_returns_local_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(send_error("already known"))
            .expect(1)
            .mount(&server)
            .await;

        let raw = [0xf8, 0x6c, 0x09];
        let tx_hash = client(&server, 3).send_raw_transaction(&raw).await.unwrap();
        assert_eq!(tx_hash, TxHash::from_array(keccak256(&raw)));
    }

    #[tokio::test]
    async fn test_resend_after_timeout_reports_broadcast() {
        let server = MockServer::start().await;
        // First reply is lost behind a 503; the resend finds the nonce used
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(send_error("nonce too low"))
            .expect(1)
            .mount(&server)
            .await;

        let raw = [0xf8, 0x6c, 0x0a];
        let tx_hash = client(&server, 3).send_raw_transaction(&raw).await.unwrap();
        assert_eq!(tx_hash, TxHash::from_array(keccak256(&raw)));
    }

    #[tokio::test]
    async fn test_transaction_receipt() {
        let server = MockServer::start().await;
        let hash = format!("0x{}", "ab".repeat(32));
        Mock::given(method("POST"))
            .and(body_partial_json(
                json!({ "method": "eth_getTransactionReceipt", "params": [hash.clone()] }),
            ))
            .respond_with(ok(json!({
                "transactionHash": hash,
                "blockNumber": "0x64",
                "gasUsed": "0x5208",
                "status": "0x1",
                "logs": []
            })))
            .mount(&server)
            .await;

        let receipt = client(&server, 0)
            .get_transaction_receipt(&TxHash::from_array([0xab; 32]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.block_number, 100);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.success);
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ok(Value::Null))
            .mount(&server)
            .await;

        let receipt = client(&server, 0)
            .get_transaction_receipt(&TxHash::from_array([0xab; 32]))
            .await
            .unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn test_already_broadcast_replies() {
        assert!(already_broadcast("already known", false));
        assert!(already_broadcast("Known transaction: 0xabc", false));
        assert!(!already_broadcast("nonce too low", false));
        assert!(already_broadcast("nonce too low", true));
        assert!(!already_broadcast("insufficient funds for gas * price + value", true));
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(RpcClient::new("not a url").is_err());
    }
}
