//! JSON-RPC over HTTP
//!
//! Transactions are sent with preflight simulation skipped so that program
//! rejections surface through signature status, as ledger-confirmed
//! failures, rather than as simulation errors at send time.

use super::{AccountFilter, LedgerRpc, SignatureStatus};
use crate::config::RpcConfig;
use crate::error::RejectionCode;
use crate::transaction::{FreshnessToken, SignedTransaction};
use crate::types::{AccountInfo, Hash, Pubkey, Signature};
use crate::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Ledger RPC client
#[derive(Debug, Clone)]
pub struct HttpRpc {
    url: String,
    commitment: String,
    http_client: Client,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    data: (String, String),
    owner: String,
}

#[derive(Debug, Deserialize)]
struct KeyedUiAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

impl HttpRpc {
    /// Create a client for `url`
    pub fn new(url: impl Into<String>, config: &RpcConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            commitment: config.commitment.clone(),
            http_client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");

        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Transport(format!("{} returned {}", method, status)));
        }
        if !status.is_success() {
            return Err(Error::Rpc {
                code: status.as_u16() as i64,
                message: format!("{} returned {}", method, status),
            });
        }

        let response: RpcResponse<T> = response.json().await?;
        match (response.result, response.error) {
            (_, Some(error)) => Err(Error::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(Error::Rpc {
                code: 0,
                message: format!("{} returned neither result nor error", method),
            }),
        }
    }
}

fn decode_account(account: UiAccount) -> Result<AccountInfo> {
    let (data, encoding) = account.data;
    if encoding != "base64" {
        return Err(Error::Rpc {
            code: 0,
            message: format!("unexpected account encoding {}", encoding),
        });
    }
    let data = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| Error::InvalidArgument(format!("account data is not base64: {}", e)))?;
    Ok(AccountInfo {
        owner: account.owner.parse()?,
        data,
    })
}

fn filter_json(filter: &AccountFilter) -> Value {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => json!({
            "memcmp": { "offset": offset, "bytes": bs58::encode(bytes).into_string() }
        }),
        AccountFilter::DataSize(size) => json!({ "dataSize": size }),
    }
}

/// Decode a transaction error object into a rejection code
///
/// `{"InstructionError": [i, {"Custom": n}]}` carries the program's code;
/// builtin instruction errors map onto their framework equivalents.
pub(crate) fn rejection_from_err(err: &Value) -> RejectionCode {
    let Some(detail) = err.get("InstructionError").and_then(|e| e.get(1)) else {
        return RejectionCode::Other(u32::MAX);
    };
    if let Some(code) = detail.get("Custom").and_then(Value::as_u64) {
        return RejectionCode::from_code(code as u32);
    }
    match detail.as_str() {
        Some("MissingRequiredSignature") => RejectionCode::ConstraintSigner,
        Some("InvalidSeeds") => RejectionCode::ConstraintSeeds,
        Some("UninitializedAccount") => RejectionCode::AccountNotInitialized,
        Some("IncorrectProgramId") => RejectionCode::AccountOwnedByWrongProgram,
        Some("InvalidInstructionData") => RejectionCode::InstructionDidNotDeserialize,
        _ => RejectionCode::Other(u32::MAX),
    }
}

#[async_trait]
impl LedgerRpc for HttpRpc {
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        let response: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment,
                }]),
            )
            .await?;
        response.value.map(decode_account).transpose()
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>> {
        let filters: Vec<Value> = filters.iter().map(filter_json).collect();
        let accounts: Vec<KeyedUiAccount> = self
            .call(
                "getProgramAccounts",
                json!([program_id.to_string(), {
                    "encoding": "base64",
                    "commitment": self.commitment,
                    "filters": filters,
                }]),
            )
            .await?;

        accounts
            .into_iter()
            .map(|keyed| Ok((keyed.pubkey.parse()?, decode_account(keyed.account)?)))
            .collect()
    }

    async fn get_latest_blockhash(&self) -> Result<FreshnessToken> {
        let response: WithContext<UiBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;
        Ok(FreshnessToken {
            blockhash: response.value.blockhash.parse::<Hash>()?,
            last_valid_block_height: response.value.last_valid_block_height,
        })
    }

    async fn get_block_height(&self) -> Result<u64> {
        self.call("getBlockHeight", json!([{ "commitment": self.commitment }]))
            .await
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus> {
        let response: WithContext<Vec<Option<UiSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;

        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(SignatureStatus::Pending);
        };
        let reached = match status.confirmation_status.as_deref() {
            Some("finalized") => true,
            Some("confirmed") => self.commitment != "finalized",
            Some("processed") => self.commitment == "processed",
            _ => false,
        };
        if !reached {
            return Ok(SignatureStatus::Pending);
        }
        Ok(match status.err {
            Some(err) if !err.is_null() => SignatureStatus::Failed(rejection_from_err(&err)),
            _ => SignatureStatus::Confirmed,
        })
    }

    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<Signature> {
        let signature: String = self
            .call(
                "sendTransaction",
                json!([transaction.to_base64(), {
                    "encoding": "base64",
                    "skipPreflight": true,
                    "maxRetries": 0,
                }]),
            )
            .await?;
        signature.parse()
    }
}
