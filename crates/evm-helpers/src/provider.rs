// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::{
        http::{
            reqwest::{
                header::{HeaderMap, HeaderValue, AUTHORIZATION},
                Client,
            },
            Http,
        },
        ws::WsConnect,
        Authorization,
    },
};
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use sealed_config::{RpcAuth, RPC};
use std::{env, sync::Arc};

use crate::contracts::{
    ContractHandle, PrivateVoteContract, RatingFactoryContract, RatingItemContract, ReadOnly,
    ReadWrite,
};

pub trait AuthConversions {
    fn to_header_value(&self) -> Option<HeaderValue>;
    fn to_ws_auth(&self) -> Option<Authorization>;
}

impl AuthConversions for RpcAuth {
    fn to_header_value(&self) -> Option<HeaderValue> {
        match self {
            RpcAuth::None => None,
            RpcAuth::Basic { username, password } => {
                let credentials = STANDARD.encode(format!("{}:{}", username, password));
                HeaderValue::from_str(&format!("Basic {}", credentials)).ok()
            }
            RpcAuth::Bearer(token) => HeaderValue::from_str(&format!("Bearer {}", token)).ok(),
        }
    }

    fn to_ws_auth(&self) -> Option<Authorization> {
        match self {
            RpcAuth::None => None,
            RpcAuth::Basic { username, password } => Some(Authorization::basic(username, password)),
            RpcAuth::Bearer(token) => Some(Authorization::bearer(token)),
        }
    }
}

/// A connected provider plus the chain id observed when connecting
#[derive(Clone)]
pub struct EthProvider {
    provider: Arc<DynProvider>,
    signer: Option<Address>,
}

impl EthProvider {
    pub fn provider(&self) -> Arc<DynProvider> {
        self.provider.clone()
    }

    /// Account that signs transactions, if this provider carries a wallet
    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    /// Chain id as reported by the node right now. Not cached: the wallet network can change
    /// between calls.
    pub async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    pub fn private_vote(&self, address: Address) -> PrivateVoteContract<ReadOnly> {
        PrivateVoteContract(ContractHandle::read_only(self.provider.clone(), address))
    }

    pub fn rating_item(&self, address: Address) -> RatingItemContract<ReadOnly> {
        RatingItemContract(ContractHandle::read_only(self.provider.clone(), address))
    }

    pub fn rating_factory(&self, address: Address) -> RatingFactoryContract<ReadOnly> {
        RatingFactoryContract(ContractHandle::read_only(self.provider.clone(), address))
    }

    fn write_handle(&self, address: Address) -> Result<ContractHandle<ReadWrite>> {
        let from = self
            .signer
            .context("Provider has no wallet attached; cannot send transactions")?;
        Ok(ContractHandle::read_write(
            self.provider.clone(),
            address,
            from,
        ))
    }

    pub fn private_vote_writer(&self, address: Address) -> Result<PrivateVoteContract<ReadWrite>> {
        Ok(PrivateVoteContract(self.write_handle(address)?))
    }

    pub fn rating_item_writer(&self, address: Address) -> Result<RatingItemContract<ReadWrite>> {
        Ok(RatingItemContract(self.write_handle(address)?))
    }

    pub fn rating_factory_writer(
        &self,
        address: Address,
    ) -> Result<RatingFactoryContract<ReadWrite>> {
        Ok(RatingFactoryContract(self.write_handle(address)?))
    }
}

pub struct ProviderConfig {
    rpc: RPC,
    auth: RpcAuth,
}

impl ProviderConfig {
    pub fn new(rpc: RPC, auth: RpcAuth) -> Self {
        Self { rpc, auth }
    }

    pub async fn create_readonly_provider(&self) -> Result<EthProvider> {
        let provider = if self.rpc.is_websocket() {
            ProviderBuilder::new()
                .connect_ws(self.create_ws_connect()?)
                .await
                .context("Failed to connect to WebSocket RPC. Check if the node is running and URL is correct.")?
                .erased()
        } else {
            ProviderBuilder::new()
                .connect_client(self.create_http_client()?)
                .erased()
        };

        Ok(EthProvider {
            provider: Arc::new(provider),
            signer: None,
        })
    }

    pub async fn create_signer_provider(&self, signer: &PrivateKeySigner) -> Result<EthProvider> {
        let wallet = EthereumWallet::from(signer.clone());

        let provider = if self.rpc.is_websocket() {
            ProviderBuilder::new()
                .wallet(wallet)
                .connect_ws(self.create_ws_connect()?)
                .await
                .context("Failed to connect to WebSocket RPC. Check if the node is running and URL is correct.")?
                .erased()
        } else {
            ProviderBuilder::new()
                .wallet(wallet)
                .connect_client(self.create_http_client()?)
                .erased()
        };

        Ok(EthProvider {
            provider: Arc::new(provider),
            signer: Some(signer.address()),
        })
    }

    fn create_ws_connect(&self) -> Result<WsConnect> {
        let mut ws_connect = WsConnect::new(self.rpc.as_ws_url()?);
        if let Some(auth) = self.auth.to_ws_auth() {
            ws_connect = ws_connect.with_auth(auth);
        }
        Ok(ws_connect)
    }

    fn create_http_client(&self) -> Result<alloy::rpc::client::RpcClient> {
        let mut headers = HeaderMap::new();
        if let Some(auth_header) = self.auth.to_header_value() {
            headers.insert(AUTHORIZATION, auth_header);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        let http = Http::with_client(client, self.rpc.as_http_url()?.parse()?);
        Ok(alloy::rpc::client::RpcClient::new(http, self.rpc.is_local()))
    }
}

/// Read a private key from `var` and scrub it from the process environment
pub fn load_signer_from_env(var: &str) -> Result<PrivateKeySigner> {
    let private_key =
        env::var(var).with_context(|| format!("Environment variable {var} is not set"))?;
    env::remove_var(var);
    private_key
        .trim()
        .parse()
        .with_context(|| format!("{var} is not a valid private key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_headers() {
        let basic = RpcAuth::Basic {
            username: "u".to_string(),
            password: "p".to_string(),
        };
        assert_eq!(
            basic.to_header_value().unwrap().to_str().unwrap(),
            "Basic dTpw"
        );
        let bearer = RpcAuth::Bearer("tok".to_string());
        assert_eq!(
            bearer.to_header_value().unwrap().to_str().unwrap(),
            "Bearer tok"
        );
        assert!(RpcAuth::None.to_header_value().is_none());
    }

    #[test]
    fn test_load_signer_from_env() -> Result<()> {
        // anvil account #0
        env::set_var(
            "SEALED_TEST_PK",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        );
        let signer = load_signer_from_env("SEALED_TEST_PK")?;
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>()?
        );
        assert!(env::var("SEALED_TEST_PK").is_err());
        Ok(())
    }
}
