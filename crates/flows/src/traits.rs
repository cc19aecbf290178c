// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Seams to the services a flow depends on. Implementations live in [`crate::evm`] and
//! [`crate::relayer`]; tests use in-memory fakes.

use crate::{
    catalog::{CatalogItem, NewItem},
    domain::ScoreDomain,
    handle::{CiphertextHandle, EncryptedInput, EncryptionRequest, Slot},
};
use alloy::primitives::{Address, Bytes, B256, U256};
use anyhow::Result;
use async_trait::async_trait;

/// Hash and block of a confirmed transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Turns plaintexts into ciphertext handles plus an input proof
#[async_trait]
pub trait EncryptionClient: Send + Sync {
    async fn encrypt(&self, request: &EncryptionRequest) -> Result<EncryptedInput>;
}

/// What the user signs to prove they intend to read ciphertexts of `contracts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionChallenge {
    pub public_key: Bytes,
    pub contracts: Vec<Address>,
    pub chain_id: u64,
    pub start_timestamp: u64,
    pub duration_days: u64,
}

/// One handle to decrypt on behalf of `requester`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDecryptRequest {
    pub handle: CiphertextHandle,
    pub contract: Address,
    pub requester: Address,
    pub signature: Bytes,
    pub challenge: DecryptionChallenge,
}

/// Authenticated decryption. Fails unless `requester` holds a grant on `contract`.
#[async_trait]
pub trait DecryptionClient: Send + Sync {
    /// Key the decrypted result is sealed to for this session
    async fn session_public_key(&self) -> Result<Bytes>;

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<u64>;
}

/// The connected wallet. Account and chain are owned by the wallet and may change at any time.
#[async_trait]
pub trait Wallet: Send + Sync {
    async fn account(&self) -> Result<Address>;
    async fn chain_id(&self) -> Result<u64>;
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;
    /// Sign a read intent. This is not a transaction signature.
    async fn sign_read_request(&self, challenge: &DecryptionChallenge) -> Result<Bytes>;
}

/// A contract that accepts one encrypted value per call, such as `vote` or `rate`
#[async_trait]
pub trait EncryptedEntrypoint: Send + Sync {
    fn address(&self) -> Address;
    fn domain(&self) -> ScoreDomain;
    /// Broadcast `(handle, proof)` in that order and wait for one confirmation
    async fn submit(&self, handle: CiphertextHandle, proof: Bytes) -> Result<TxOutcome>;
}

/// A contract exposing encrypted aggregates
#[async_trait]
pub trait AggregateSource: Send + Sync {
    fn address(&self) -> Address;
    async fn slots(&self) -> Result<Vec<Slot>>;
    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle>;
}

/// A contract that grants decryption rights on its aggregates for a fee
#[async_trait]
pub trait AccessGranter: Send + Sync {
    fn address(&self) -> Address;
    async fn grant_fee(&self) -> Result<U256>;
    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome>;
}

/// Factory that lists rating items and creates or promotes them for a fee
#[async_trait]
pub trait ItemRegistry: Send + Sync {
    fn address(&self) -> Address;
    async fn items_count(&self) -> Result<u64>;
    async fn item(&self, id: u64) -> Result<CatalogItem>;
    async fn creation_fee(&self) -> Result<U256>;
    async fn promote_fee(&self) -> Result<U256>;
    async fn create_item(&self, item: &NewItem, fee: U256) -> Result<TxOutcome>;
    async fn promote_item(&self, id: u64, fee: U256) -> Result<TxOutcome>;
}
