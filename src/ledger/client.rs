//! HTTP chain client
//!
//! Implements [`LedgerGateway`] over the chain's HTTP API using `reqwest`:
//! `get_info` for the head block and chain id, `get_block` for the TAPOS
//! reference, `abi_json_to_bin` for JSON action arguments, then a locally
//! packed and signed `push_transaction`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{RelayError, Result};
use crate::ledger::keys::KeyPair;
use crate::ledger::name::name_to_u64;
use crate::ledger::wire::{self, BoundAction, TransactionHeader};
use crate::ledger::{ActionData, LedgerGateway, Receipt, SessionParams, TransactionDraft};

pub struct HttpLedgerClient {
    http: reqwest::Client,
}

impl HttpLedgerClient {
    /// Build a client whose chain calls are bounded by `timeout`. A slow or
    /// unreachable ledger then surfaces as an in-band error instead of
    /// holding the relay's response open.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::ConnectionError(format!("Failed to build client: {}", e)))?;
        Ok(HttpLedgerClient { http })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        path: &str,
        body: &Value,
    ) -> Result<T> {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::ConnectionError(e.to_string()))?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| RelayError::MalformedResponse(format!("{}: {}", path, e)))?;
        if !status.is_success() {
            return Err(RelayError::Rejected(extract_error_message(&payload)));
        }
        serde_json::from_value(payload)
            .map_err(|e| RelayError::MalformedResponse(format!("{}: {}", path, e)))
    }
}

/// Pull the most specific message out of a chain error body, falling back
/// to the whole payload.
fn extract_error_message(payload: &Value) -> String {
    payload
        .pointer("/error/details/0/message")
        .and_then(Value::as_str)
        .or_else(|| payload.pointer("/error/what").and_then(Value::as_str))
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| payload.to_string())
}

#[derive(Debug, Deserialize)]
struct ChainInfo {
    chain_id: String,
    head_block_time: String,
    last_irreversible_block_num: u32,
}

#[derive(Debug, Deserialize)]
struct BlockRef {
    block_num: u32,
    ref_block_prefix: u32,
}

#[derive(Debug, Deserialize)]
struct BinArgs {
    binargs: String,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    processed: Processed,
}

#[derive(Debug, Deserialize)]
struct Processed {
    id: String,
    receipt: ProcessedReceipt,
}

#[derive(Debug, Deserialize)]
struct ProcessedReceipt {
    status: String,
}

/// Block timestamps come back without a timezone, e.g.
/// `2026-08-07T12:00:00.500`.
fn parse_block_time(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| RelayError::MalformedResponse(format!("bad block time '{}': {}", s, e)))
}

#[async_trait]
impl LedgerGateway for HttpLedgerClient {
    async fn submit(&self, session: &SessionParams, draft: &TransactionDraft) -> Result<Receipt> {
        if session.http_endpoint.is_empty() {
            return Err(RelayError::ConnectionError(
                "no httpEndpoint supplied".to_string(),
            ));
        }
        if session.key_provider.is_empty() {
            return Err(RelayError::CryptoError(
                "keyProvider contains no keys".to_string(),
            ));
        }

        // Decode signing keys up front; a bad key should fail before any
        // chain traffic.
        let keys = session
            .key_provider
            .iter()
            .map(|wif| KeyPair::from_wif(wif))
            .collect::<Result<Vec<_>>>()?;

        let chain_id_bytes: [u8; 32] = hex::decode(&session.chain_id)
            .map_err(|e| RelayError::InvalidInput(format!("chainId must be hex: {}", e)))?
            .try_into()
            .map_err(|_| RelayError::InvalidInput("chainId must be 32 bytes of hex".to_string()))?;

        let endpoint = &session.http_endpoint;
        let info: ChainInfo = self.call(endpoint, "v1/chain/get_info", &json!({})).await?;
        if !info.chain_id.eq_ignore_ascii_case(&session.chain_id) {
            return Err(RelayError::Rejected(format!(
                "chain id mismatch: ledger reports {}",
                info.chain_id
            )));
        }

        let block: BlockRef = self
            .call(
                endpoint,
                "v1/chain/get_block",
                &json!({ "block_num_or_id": info.last_irreversible_block_num }),
            )
            .await?;

        let mut bound = Vec::with_capacity(draft.actions.len());
        for action in &draft.actions {
            let data = match &action.data {
                ActionData::Raw(bytes) => bytes.clone(),
                ActionData::Json(args) => {
                    let serialized: BinArgs = self
                        .call(
                            endpoint,
                            "v1/chain/abi_json_to_bin",
                            &json!({
                                "code": action.account,
                                "action": action.name,
                                "args": args,
                            }),
                        )
                        .await?;
                    hex::decode(&serialized.binargs).map_err(|e| {
                        RelayError::MalformedResponse(format!("abi_json_to_bin: {}", e))
                    })?
                }
            };
            bound.push(BoundAction {
                account: name_to_u64(&action.account)?,
                name: name_to_u64(&action.name)?,
                authorization: action
                    .authorization
                    .iter()
                    .map(|level| {
                        Ok((name_to_u64(&level.actor)?, name_to_u64(&level.permission)?))
                    })
                    .collect::<Result<Vec<_>>>()?,
                data,
            });
        }

        let head_time = parse_block_time(&info.head_block_time)?;
        let expiration = head_time.and_utc().timestamp() as u32 + draft.expire_secs;
        let header = TransactionHeader::new(expiration, block.block_num, block.ref_block_prefix);
        let packed = wire::pack_transaction(&header, &bound);
        let digest = wire::signing_digest(&chain_id_bytes, &packed);

        let signatures = keys
            .iter()
            .map(|key| key.sign_canonical(&digest))
            .collect::<Result<Vec<_>>>()?;

        let push: PushResponse = self
            .call(
                endpoint,
                "v1/chain/push_transaction",
                &json!({
                    "signatures": signatures,
                    "compression": "none",
                    "packed_context_free_data": "",
                    "packed_trx": hex::encode(&packed),
                }),
            )
            .await?;

        Ok(Receipt {
            id: push.processed.id,
            status: push.processed.receipt.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_time() {
        let t = parse_block_time("2026-08-07T12:00:00.500").unwrap();
        assert_eq!(t.and_utc().timestamp_subsec_millis(), 500);
        assert!(parse_block_time("2026-08-07 12:00").is_err());
    }

    #[test]
    fn test_extract_error_message_prefers_details() {
        let payload = json!({
            "code": 500,
            "message": "Internal Service Error",
            "error": {
                "what": "Invalid transaction",
                "details": [{ "message": "account newname already exists" }]
            }
        });
        assert_eq!(
            extract_error_message(&payload),
            "account newname already exists"
        );

        let payload = json!({ "error": { "what": "Invalid transaction" } });
        assert_eq!(extract_error_message(&payload), "Invalid transaction");

        let payload = json!({ "message": "not found" });
        assert_eq!(extract_error_message(&payload), "not found");

        let payload = json!({ "unexpected": true });
        assert_eq!(extract_error_message(&payload), r#"{"unexpected":true}"#);
    }
}
