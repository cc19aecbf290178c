// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    contract::{Contract, SealedContracts},
    rpc::{RpcAuth, RPC},
};
use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainConfig {
    pub name: String,
    pub rpc_url: String,
    #[serde(default)]
    pub rpc_auth: RpcAuth,
    /// Chain id every flow requires the wallet to be on
    pub chain_id: u64,
    /// Base url of the FHEVM relayer gateway
    pub relayer_url: Option<String>,
    #[serde(default)]
    pub contracts: SealedContracts,
}

impl ChainConfig {
    pub fn rpc(&self) -> Result<RPC> {
        RPC::from_url(&self.rpc_url)
            .map_err(|e| anyhow!("Failed to parse RPC URL for chain {}: {}", self.name, e))
    }

    pub fn relayer_url(&self) -> Result<Url> {
        let raw = self
            .relayer_url
            .as_ref()
            .ok_or_else(|| anyhow!("No relayer_url configured for chain {}", self.name))?;
        Url::parse(raw).map_err(|e| anyhow!("Invalid relayer_url for chain {}: {}", self.name, e))
    }

    fn require(&self, contract: &Option<Contract>, label: &str) -> Result<Address> {
        contract
            .as_ref()
            .ok_or_else(|| {
                anyhow!(
                    "Contract `{}` is not configured for chain {}",
                    label,
                    self.name
                )
            })?
            .address()
    }

    pub fn private_vote(&self) -> Result<Address> {
        self.require(&self.contracts.private_vote, "private_vote")
    }

    pub fn rating_factory(&self) -> Result<Address> {
        self.require(&self.contracts.rating_factory, "rating_factory")
    }

    pub fn rating_item(&self) -> Result<Address> {
        self.require(&self.contracts.rating_item, "rating_item")
    }

    pub fn decryption_verifier(&self) -> Result<Address> {
        self.require(&self.contracts.decryption_verifier, "decryption_verifier")
    }
}
