//! REST API client for an algod node.
//!
//! Provides access to:
//! - Node status: latest committed round
//! - Blocks: confirmed transactions by round
//! - Pending pool: unconfirmed transactions
//! - Suggested params and raw transaction submission

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::events::{PendingTxn, SuggestedParams, TxnNode};

use super::auth::NodeCredentials;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after: {0}ms")]
    RateLimited(u64),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
}

impl ApiError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::RequestFailed(_) | ApiError::RateLimited(_) => true,
            ApiError::ApiError { status, .. } => *status >= 500,
            ApiError::ParseError(_) => false,
        }
    }

    /// How long to wait before retrying: the node's retry-after when rate
    /// limited, never shorter than `poll_interval`.
    pub fn backoff(&self, poll_interval: Duration) -> Duration {
        match self {
            ApiError::RateLimited(ms) => Duration::from_millis(*ms).max(poll_interval),
            _ => poll_interval,
        }
    }
}

/// algod REST client.
#[derive(Clone)]
pub struct AlgodClient {
    client: Client,
    base_url: String,
    credentials: NodeCredentials,
}

impl AlgodClient {
    pub fn new(base_url: String, credentials: NodeCredentials) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.auth_header() {
            Some((name, value)) => request.header(name, value),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.authorized(self.client.get(&url)).send().await?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(format!("{}: {}", path, e)))
    }

    /// Latest committed round.
    pub async fn status(&self) -> Result<StatusResponse, ApiError> {
        self.get_json("/v2/status").await
    }

    /// Top-level transactions of the block at `round`.
    pub async fn block(&self, round: u64) -> Result<BlockResponse, ApiError> {
        self.get_json(&format!("/v2/blocks/{}?format=json", round))
            .await
    }

    pub async fn pending_transactions(&self) -> Result<PendingResponse, ApiError> {
        self.get_json("/v2/transactions/pending?format=json").await
    }

    pub async fn transaction_params(&self) -> Result<SuggestedParams, ApiError> {
        self.get_json("/v2/transactions/params").await
    }

    /// Submits concatenated signed transactions and returns the first txid.
    pub async fn send_raw_transaction(&self, signed: Vec<u8>) -> Result<String, ApiError> {
        let url = format!("{}/v2/transactions", self.base_url);
        debug!("Submitting {} bytes of signed transactions", signed.len());

        let request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(signed);
        let response = self.authorized(request).send().await?;
        let response = check_status(response).await?;

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(e.to_string()))?;
        Ok(submitted.tx_id)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_MS);
        warn!("Node rate limited. Retry after {}ms", retry_after);
        return Err(ApiError::RateLimited(retry_after));
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::ApiError { status, message });
    }

    Ok(response)
}

// ============ Response Types ============

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(rename = "last-round")]
    pub last_round: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockResponse {
    pub block: BlockBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockBody {
    #[serde(default)]
    pub txns: Vec<TxnNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingResponse {
    #[serde(rename = "top-transactions", default)]
    pub top_transactions: Vec<PendingTxn>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

impl std::fmt::Debug for AlgodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgodClient")
            .field("base_url", &self.base_url)
            .field("has_token", &self.credentials.auth_header().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::RateLimited(1000).is_transient());
        assert!(ApiError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!ApiError::ApiError {
            status: 404,
            message: String::new()
        }
        .is_transient());
        assert!(!ApiError::ParseError("bad".to_string()).is_transient());
    }

    #[test]
    fn test_backoff_honors_retry_after() {
        let poll = Duration::from_secs(1);
        assert_eq!(ApiError::RateLimited(2500).backoff(poll), Duration::from_millis(2500));
        assert_eq!(ApiError::RateLimited(10).backoff(poll), poll);
        assert_eq!(ApiError::ParseError("bad".to_string()).backoff(poll), poll);
    }

    #[test]
    fn test_block_response_shape() {
        let json = r#"{
            "block": {
                "rnd": 5,
                "txns": [
                    {"txn": {"type": "acfg"}, "caid": 77},
                    {"txn": {"type": "appl"}, "dt": {"itx": [{"caid": 78}]}}
                ]
            }
        }"#;
        let block: BlockResponse = serde_json::from_str(json).unwrap();
        assert_eq!(block.block.txns.len(), 2);
        assert_eq!(block.block.txns[0].created_asset_id, Some(77));

        let empty: BlockResponse = serde_json::from_str(r#"{"block": {"rnd": 6}}"#).unwrap();
        assert!(empty.block.txns.is_empty());
    }

    #[test]
    fn test_pending_and_submit_shapes() {
        let pending: PendingResponse = serde_json::from_str(
            r#"{"top-transactions": [{"txn": {"type": "pay", "snd": "X"}}], "total-transactions": 1}"#,
        )
        .unwrap();
        assert_eq!(pending.top_transactions.len(), 1);

        let none: PendingResponse = serde_json::from_str(r#"{"total-transactions": 0}"#).unwrap();
        assert!(none.top_transactions.is_empty());

        let submitted: SubmitResponse = serde_json::from_str(r#"{"txId": "ABC"}"#).unwrap();
        assert_eq!(submitted.tx_id, "ABC");
    }

    #[test]
    fn test_base_url_trimmed_and_debug_hides_token() {
        let client = AlgodClient::new(
            "http://localhost:4001/".to_string(),
            NodeCredentials::new("secret".to_string()),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:4001");
        let debug_str = format!("{:?}", client);
        assert!(!debug_str.contains("secret"));
    }
}
