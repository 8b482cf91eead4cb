//! # JSON-RPC Connection
//!
//! [`Connection`] over the validator's JSON-RPC 2.0 API. Four methods cover
//! the whole lifecycle:
//!
//! | Method                 | Purpose                                      |
//! |------------------------|----------------------------------------------|
//! | `getAccountInfo`       | fetch the vault record (base58, data slice)  |
//! | `getLatestBlockhash`   | anchor a new transaction                     |
//! | `sendTransaction`      | submit (base58 wire bytes, with preflight)   |
//! | `getSignatureStatuses` | poll until the commitment level is reached   |
//!
//! Account data is requested as base58 with a slice covering just the vault
//! record; base58 is only served for payloads under 129 bytes and the record
//! is 33.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::http::{post_json, Endpoint};
use super::{Account, ClusterError, Connection};
use crate::config::{ClientConfig, Commitment, DEFAULT_CONFIRM_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::crypto::keys::{Hash, Pubkey, Signature};
use crate::program::{ProgramError, VaultRecord};
use crate::transaction::Transaction;

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Always "2.0".
    pub jsonrpc: String,
    /// Echoed back in the response.
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object. For failed preflight simulations `data.err` carries
/// the transaction error and `data.logs` the program logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Contextual<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    data: (String, String),
    executable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureStatus {
    confirmation_status: Option<String>,
    err: Option<Value>,
}

// ---------------------------------------------------------------------------
// Response Decoding
// ---------------------------------------------------------------------------

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClusterError> {
    serde_json::from_value(value).map_err(|e| ClusterError::Decode(e.to_string()))
}

/// Map a transaction error value to a client error.
///
/// `{"InstructionError":[i,{"Custom":n}]}` becomes [`ClusterError::Program`];
/// every other shape (`"BlockhashNotFound"`, `"InsufficientFundsForFee"`, ...)
/// becomes [`ClusterError::Rejected`] carrying the JSON.
pub fn transaction_error(err: &Value) -> ClusterError {
    match err
        .get("InstructionError")
        .and_then(|ie| ie.get(1))
        .and_then(|inner| inner.get("Custom"))
        .and_then(Value::as_u64)
    {
        Some(code) => ClusterError::Program(ProgramError::from_code(code as u32)),
        None => ClusterError::Rejected(err.to_string()),
    }
}

fn rpc_error(error: RpcErrorObject) -> ClusterError {
    match error
        .data
        .as_ref()
        .and_then(|d| d.get("err"))
        .filter(|e| !e.is_null())
    {
        Some(err) => transaction_error(err),
        None => ClusterError::Rpc {
            code: error.code,
            message: error.message,
        },
    }
}

fn parse_account(result: Value) -> Result<Option<Account>, ClusterError> {
    let ctx: Contextual<Option<UiAccount>> = decode(result)?;
    let Some(ui) = ctx.value else {
        return Ok(None);
    };
    if ui.data.1 != "base58" {
        return Err(ClusterError::Decode(format!(
            "unexpected account encoding `{}`",
            ui.data.1
        )));
    }
    let data = bs58::decode(&ui.data.0)
        .into_vec()
        .map_err(|e| ClusterError::Decode(format!("account data: {}", e)))?;
    let owner = ui
        .owner
        .parse()
        .map_err(|e| ClusterError::Decode(format!("account owner: {}", e)))?;
    Ok(Some(Account {
        lamports: ui.lamports,
        owner,
        data,
        executable: ui.executable,
    }))
}

fn parse_blockhash(result: Value) -> Result<Hash, ClusterError> {
    let ctx: Contextual<UiBlockhash> = decode(result)?;
    ctx.value
        .blockhash
        .parse()
        .map_err(|e| ClusterError::Decode(format!("blockhash: {}", e)))
}

fn parse_status(result: Value) -> Result<Option<UiSignatureStatus>, ClusterError> {
    let ctx: Contextual<Vec<Option<UiSignatureStatus>>> = decode(result)?;
    Ok(ctx.value.into_iter().next().flatten())
}

// ---------------------------------------------------------------------------
// RpcConnection
// ---------------------------------------------------------------------------

/// A [`Connection`] to a validator's JSON-RPC endpoint.
#[derive(Debug)]
pub struct RpcConnection {
    endpoint: Endpoint,
    confirm_timeout: Duration,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl RpcConnection {
    pub fn new(url: &str) -> Result<Self, ClusterError> {
        Ok(Self {
            endpoint: url.parse()?,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClusterError> {
        Ok(Self::new(&config.rpc_url)?.with_timeouts(config.confirm_timeout(), config.poll_interval()))
    }

    pub fn with_timeouts(mut self, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ClusterError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        let body = serde_json::to_vec(&request).map_err(|e| ClusterError::Decode(e.to_string()))?;

        tracing::trace!(method, id, "rpc request");
        let raw = post_json(&self.endpoint, &body).await?;
        let response: RpcResponse =
            serde_json::from_slice(&raw).map_err(|e| ClusterError::Decode(e.to_string()))?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(rpc_error(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ClusterError::Decode(format!(
                "{} response carries neither result nor error",
                method
            ))),
        }
    }
}

#[async_trait]
impl Connection for RpcConnection {
    async fn get_account(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<Option<Account>, ClusterError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    {
                        "encoding": "base58",
                        "commitment": commitment.as_str(),
                        "dataSlice": { "offset": 0, "length": VaultRecord::ENCODED_LEN },
                    }
                ]),
            )
            .await?;
        parse_account(result)
    }

    async fn latest_blockhash(&self, commitment: Commitment) -> Result<Hash, ClusterError> {
        let result = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": commitment.as_str() }]),
            )
            .await?;
        parse_blockhash(result)
    }

    async fn send_and_confirm(
        &self,
        tx: &Transaction,
        commitment: Commitment,
    ) -> Result<Signature, ClusterError> {
        let wire = tx
            .serialize()
            .map_err(|e| ClusterError::Decode(e.to_string()))?;
        let result = self
            .call(
                "sendTransaction",
                json!([
                    bs58::encode(wire).into_string(),
                    { "encoding": "base58", "preflightCommitment": commitment.as_str() }
                ]),
            )
            .await?;
        let signature: Signature = decode::<String>(result)?
            .parse()
            .map_err(|e| ClusterError::Decode(format!("signature: {}", e)))?;
        tracing::debug!(%signature, "transaction sent, awaiting confirmation");

        let started = Instant::now();
        loop {
            let result = self
                .call(
                    "getSignatureStatuses",
                    json!([[signature.to_string()], { "searchTransactionHistory": false }]),
                )
                .await?;
            if let Some(status) = parse_status(result)? {
                if let Some(err) = status.err.as_ref().filter(|e| !e.is_null()) {
                    return Err(transaction_error(err));
                }
                if status
                    .confirmation_status
                    .as_deref()
                    .is_some_and(|s| commitment.is_satisfied_by(s))
                {
                    return Ok(signature);
                }
            }
            if started.elapsed() >= self.confirm_timeout {
                return Err(ClusterError::Timeout {
                    signature,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let req = RpcRequest::new(7, "getLatestBlockhash", json!([]));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["method"], "getLatestBlockhash");
    }

    #[test]
    fn missing_account_is_none() {
        let result = json!({ "context": { "slot": 5 }, "value": null });
        assert!(parse_account(result).unwrap().is_none());
    }

    #[test]
    fn account_is_decoded() {
        let owner = Pubkey::new_from_array([3; 32]);
        let result = json!({
            "context": { "slot": 5 },
            "value": {
                "lamports": 42,
                "owner": owner.to_string(),
                "data": [bs58::encode([1u8, 2, 3]).into_string(), "base58"],
                "executable": false,
                "rentEpoch": 0
            }
        });
        let account = parse_account(result).unwrap().unwrap();
        assert_eq!(account.lamports, 42);
        assert_eq!(account.owner, owner);
        assert_eq!(account.data, vec![1, 2, 3]);
    }

    #[test]
    fn custom_instruction_error_maps_to_program_error() {
        let err = transaction_error(&json!({ "InstructionError": [0, { "Custom": 6000 }] }));
        match err {
            ClusterError::Program(p) => assert!(p.is_time_lock_not_reached()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_transaction_errors_are_rejections() {
        assert!(matches!(
            transaction_error(&json!("BlockhashNotFound")),
            ClusterError::Rejected(s) if s.contains("BlockhashNotFound")
        ));
    }

    #[test]
    fn preflight_failure_uses_embedded_err() {
        let error: RpcErrorObject = serde_json::from_value(json!({
            "code": -32002,
            "message": "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1770",
            "data": { "err": { "InstructionError": [0, { "Custom": 6000 }] }, "logs": [] }
        }))
        .unwrap();
        assert!(matches!(
            rpc_error(error),
            ClusterError::Program(p) if p.code == 6000
        ));
    }

    #[test]
    fn plain_rpc_error() {
        let error = RpcErrorObject {
            code: -32601,
            message: "Method not found".into(),
            data: None,
        };
        assert!(matches!(
            rpc_error(error),
            ClusterError::Rpc { code: -32601, .. }
        ));
    }

    #[test]
    fn signature_status_parsing() {
        let pending = json!({ "context": { "slot": 1 }, "value": [null] });
        assert!(parse_status(pending).unwrap().is_none());

        let done = json!({
            "context": { "slot": 1 },
            "value": [{ "slot": 1, "confirmations": null, "err": null, "confirmationStatus": "finalized" }]
        });
        let status = parse_status(done).unwrap().unwrap();
        assert_eq!(status.confirmation_status.as_deref(), Some("finalized"));
        assert!(status.err.is_none());
    }
}
