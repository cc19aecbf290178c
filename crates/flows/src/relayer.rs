// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! JSON client for an FHEVM relayer gateway.
//!
//! The gateway performs input encryption with its proof of knowledge, and user decryption once
//! the requester's read-intent signature and on-chain grant check out.

use crate::{
    handle::{CiphertextHandle, EncryptedInput, EncryptionRequest},
    traits::{DecryptionClient, EncryptionClient, UserDecryptRequest},
};
use alloy::primitives::{Address, Bytes, B256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use sealed_utils::{retry_with_backoff, to_failure, to_retry, RetryError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const RELAYER_MAX_ATTEMPTS: u32 = 3;
const RELAYER_INITIAL_DELAY_MS: u64 = 1000;

pub const INPUT_PROOF_PATH: &str = "v1/input-proof";
pub const USER_DECRYPT_PATH: &str = "v1/user-decrypt";
pub const KEYPAIR_PATH: &str = "v1/keypair";

#[derive(Debug, Serialize)]
struct TypedValue {
    #[serde(rename = "type")]
    kind: &'static str,
    value: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InputProofRequest {
    contract_address: Address,
    user_address: Address,
    values: Vec<TypedValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputProofResponse {
    handles: Vec<B256>,
    input_proof: Bytes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDecryptBody {
    handle: B256,
    contract_address: Address,
    user_address: Address,
    public_key: Bytes,
    signature: Bytes,
    contract_addresses: Vec<Address>,
    chain_id: u64,
    start_timestamp: u64,
    duration_days: u64,
}

#[derive(Debug, Deserialize)]
struct UserDecryptResponse {
    /// Decimal string so values wider than a JSON number survive
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeypairResponse {
    public_key: Bytes,
}

pub struct RelayerClient {
    http: Client,
    base: Url,
    session_key: OnceCell<Bytes>,
}

impl RelayerClient {
    pub fn new(mut base: Url) -> Result<Self> {
        // `join` replaces the last segment unless the path ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create relayer HTTP client")?;
        Ok(Self {
            http,
            base,
            session_key: OnceCell::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("Invalid relayer path {path}"))
    }

    async fn send<Res: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Res, RetryError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                to_retry(e)
            } else {
                to_failure(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = anyhow!("relayer returned {status}: {body}");
            return Err(if is_transient(status) {
                to_retry(err)
            } else {
                to_failure(err)
            });
        }
        response
            .json::<Res>()
            .await
            .map_err(|e| to_failure(anyhow!("malformed relayer response: {e}")))
    }

    async fn post<Req, Res>(&self, path: &str, body: &Req) -> Result<Res>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "relayer request");
        retry_with_backoff(
            || self.send(self.http.post(url.clone()).json(body)),
            RELAYER_MAX_ATTEMPTS,
            RELAYER_INITIAL_DELAY_MS,
        )
        .await
    }

    async fn get<Res: DeserializeOwned>(&self, path: &str) -> Result<Res> {
        let url = self.endpoint(path)?;
        retry_with_backoff(
            || self.send(self.http.get(url.clone())),
            RELAYER_MAX_ATTEMPTS,
            RELAYER_INITIAL_DELAY_MS,
        )
        .await
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[async_trait]
impl EncryptionClient for RelayerClient {
    #[instrument(skip_all, fields(contract = %request.contract))]
    async fn encrypt(&self, request: &EncryptionRequest) -> Result<EncryptedInput> {
        let body = InputProofRequest {
            contract_address: request.contract,
            user_address: request.submitter,
            values: request
                .values
                .iter()
                .map(|v| TypedValue {
                    kind: "euint32",
                    value: v.0,
                })
                .collect(),
        };
        let res: InputProofResponse = self.post(INPUT_PROOF_PATH, &body).await?;
        Ok(EncryptedInput {
            contract: request.contract,
            submitter: request.submitter,
            handles: res.handles.into_iter().map(CiphertextHandle).collect(),
            proof: res.input_proof,
        })
    }
}

#[async_trait]
impl DecryptionClient for RelayerClient {
    async fn session_public_key(&self) -> Result<Bytes> {
        let key = self
            .session_key
            .get_or_try_init(|| async {
                let res: KeypairResponse = self.get(KEYPAIR_PATH).await?;
                Ok::<_, anyhow::Error>(res.public_key)
            })
            .await?;
        Ok(key.clone())
    }

    #[instrument(skip_all, fields(contract = %request.contract, handle = %request.handle))]
    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<u64> {
        let body = UserDecryptBody {
            handle: request.handle.as_bytes32(),
            contract_address: request.contract,
            user_address: request.requester,
            public_key: request.challenge.public_key.clone(),
            signature: request.signature.clone(),
            contract_addresses: request.challenge.contracts.clone(),
            chain_id: request.challenge.chain_id,
            start_timestamp: request.challenge.start_timestamp,
            duration_days: request.challenge.duration_days,
        };
        let res: UserDecryptResponse = self.post(USER_DECRYPT_PATH, &body).await?;
        res.value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("relayer returned a non-integer plaintext '{}'", res.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_keeps_base_path() -> Result<()> {
        let client = RelayerClient::new(Url::parse("https://relayer.example/api")?)?;
        assert_eq!(
            client.endpoint(INPUT_PROOF_PATH)?.as_str(),
            "https://relayer.example/api/v1/input-proof"
        );
        let client = RelayerClient::new(Url::parse("https://relayer.example/api/")?)?;
        assert_eq!(
            client.endpoint(INPUT_PROOF_PATH)?.as_str(),
            "https://relayer.example/api/v1/input-proof"
        );
        let client = RelayerClient::new(Url::parse("https://relayer.example")?)?;
        assert_eq!(
            client.endpoint(INPUT_PROOF_PATH)?.as_str(),
            "https://relayer.example/v1/input-proof"
        );
        Ok(())
    }

    #[test]
    fn test_input_proof_wire_format() -> Result<()> {
        let body = InputProofRequest {
            contract_address: Address::repeat_byte(0x11),
            user_address: Address::repeat_byte(0x22),
            values: vec![TypedValue {
                kind: "euint32",
                value: 4,
            }],
        };
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["values"], json!([{ "type": "euint32", "value": 4 }]));
        assert!(value["contractAddress"].is_string());
        assert!(value["userAddress"].is_string());

        let res: InputProofResponse = serde_json::from_value(json!({
            "handles": [format!("0x{}", "ab".repeat(32))],
            "inputProof": "0x0102"
        }))?;
        assert_eq!(res.handles[0], B256::repeat_byte(0xab));
        assert_eq!(res.input_proof, Bytes::from_static(&[1, 2]));
        Ok(())
    }

    #[test]
    fn test_decrypt_response_is_decimal_string() -> Result<()> {
        let res: UserDecryptResponse = serde_json::from_value(json!({ "value": "42" }))?;
        assert_eq!(res.value.parse::<u64>()?, 42);
        Ok(())
    }

    #[test]
    fn test_endpoints_join_base() -> Result<()> {
        let client = RelayerClient::new(Url::parse("https://relayer.example/")?)?;
        assert_eq!(
            client.endpoint(USER_DECRYPT_PATH)?.as_str(),
            "https://relayer.example/v1/user-decrypt"
        );
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::FORBIDDEN));
        Ok(())
    }
}
