//! [`LedgerQuery`] over the Cosmos LCD REST API.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use sha2::{Digest, Sha256};

use crate::errors::{CosmosError, Result};
use crate::network::NetworkProfile;
use crate::query::{BroadcastMode, LedgerQuery};
use crate::types::ConfirmedResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// gRPC status code the LCD gateway uses for unknown accounts and transactions.
const GRPC_NOT_FOUND: i64 = 5;

#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CosmosError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_profile(profile: &NetworkProfile) -> Result<Self> {
        if profile.rest_url.is_empty() {
            return Err(CosmosError::Config(format!(
                "{} has no REST url",
                profile.chain_id
            )));
        }
        Self::new(profile.rest_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET returning `None` for not-found responses.
    async fn get_optional(&self, path: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| CosmosError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CosmosError::Transport(e.to_string()))?;
        if status == StatusCode::NOT_FOUND || is_not_found_body(&body) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CosmosError::Transport(format!(
                "GET {} returned {}: {}",
                path,
                status,
                extract_error_message(&body)
            )));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<(StatusCode, String)> {
        let response = self
            .client
            .post(self.url(path))
            .json(payload)
            .send()
            .await
            .map_err(|e| CosmosError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CosmosError::Transport(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl LedgerQuery for RestClient {
    async fn get_account(&self, address: &str) -> Result<Option<Value>> {
        let body = self
            .get_optional(&format!("/cosmos/auth/v1beta1/accounts/{}", address))
            .await?;
        Ok(body.and_then(|mut body| body.get_mut("account").map(Value::take)))
    }

    async fn get_tx(&self, hash: &str) -> Result<Option<ConfirmedResult>> {
        match self
            .get_optional(&format!("/cosmos/tx/v1beta1/txs/{}", hash))
            .await?
        {
            Some(body) => Ok(Some(parse_tx_response(&body)?)),
            None => Ok(None),
        }
    }

    async fn simulate(&self, tx_bytes: &[u8]) -> Result<u64> {
        let payload = json!({ "tx_bytes": BASE64_STANDARD.encode(tx_bytes) });
        let (status, body) = self.post("/cosmos/tx/v1beta1/simulate", &payload).await?;
        if !status.is_success() {
            return Err(CosmosError::SimulationFailed(extract_error_message(&body)));
        }
        parse_simulate_response(&serde_json::from_str(&body)?)
    }

    async fn broadcast_tx(&self, tx_bytes: &[u8], mode: BroadcastMode) -> Result<ConfirmedResult> {
        let payload = json!({
            "tx_bytes": BASE64_STANDARD.encode(tx_bytes),
            "mode": mode.as_str(),
        });
        let (status, body) = self.post("/cosmos/tx/v1beta1/txs", &payload).await?;
        if !status.is_success() {
            if let Some(rejection) = rejection_from_body(&body, tx_bytes) {
                return Err(rejection);
            }
            return Err(CosmosError::Transport(format!(
                "broadcast returned {}: {}",
                status,
                extract_error_message(&body)
            )));
        }
        parse_tx_response(&serde_json::from_str(&body)?)
    }
}

#[serde_as]
#[derive(Deserialize)]
struct GasInfo {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    gas_used: u64,
}

#[derive(Deserialize)]
struct SimulateResponse {
    gas_info: GasInfo,
}

pub fn parse_simulate_response(body: &Value) -> Result<u64> {
    let response = SimulateResponse::deserialize(body).map_err(|e| {
        CosmosError::SimulationFailed(format!("unexpected simulate response: {}", e))
    })?;
    Ok(response.gas_info.gas_used)
}

pub fn parse_tx_response(body: &Value) -> Result<ConfirmedResult> {
    let tx_response = body
        .get("tx_response")
        .ok_or_else(|| CosmosError::InvalidData("response has no tx_response".to_string()))?;
    Ok(ConfirmedResult::deserialize(tx_response)?)
}

/// The `message` of an LCD error body, or the raw body when it is not one.
pub fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// A failed broadcast whose body still carries a result code: either a `tx_response` or a
/// gateway error. The hash falls back to the one computed from the submitted bytes.
fn rejection_from_body(body: &str, tx_bytes: &[u8]) -> Option<CosmosError> {
    let value: Value = serde_json::from_str(body).ok()?;
    let local_hash = || hex::encode_upper(Sha256::digest(tx_bytes));
    if let Ok(result) = parse_tx_response(&value) {
        if result.is_success() {
            return None;
        }
        let hash = if result.transaction_hash.is_empty() {
            local_hash()
        } else {
            result.transaction_hash
        };
        return Some(CosmosError::TransactionRejected {
            hash,
            code: result.code,
            raw_log: result.raw_log,
        });
    }
    let code = value
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|code| u32::try_from(code).ok())
        .filter(|code| *code != 0)?;
    Some(CosmosError::TransactionRejected {
        hash: local_hash(),
        code,
        raw_log: extract_error_message(body),
    })
}

fn is_not_found_body(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("code").and_then(Value::as_i64))
        == Some(GRPC_NOT_FOUND)
}
