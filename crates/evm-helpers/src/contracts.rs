// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, FixedBytes, U256},
    providers::{DynProvider, Provider},
    rpc::types::TransactionReceipt,
    sol,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::retry::call_with_retry;

/// Read failures worth another attempt. Reverts are not among them.
pub const RETRYABLE_READ_ERRORS: &[&str] = &["timeout", "timed out", "connection", "429", "503"];

static NONCE_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub async fn next_pending_nonce<P>(provider: &P, from: Address) -> Result<u64>
where
    P: Provider<Ethereum> + Send + Sync,
{
    Ok(provider.get_transaction_count(from).pending().await?)
}

sol! {
    #[derive(Debug)]
    #[sol(rpc)]
    contract PrivateVote {
        function numOptions() external view returns (uint8);
        function getTally(uint8 index) external view returns (bytes32);
        function vote(bytes32 inputChoice, bytes calldata inputProof) external;
        function allowAllTo(address reader) external payable;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract RatingItem {
        function getSum() external view returns (bytes32);
        function getCount() external view returns (bytes32);
        function rate(bytes32 inputScore, bytes calldata inputProof) external;
        function allowAllTo(address reader) external payable;
    }

    #[derive(Debug)]
    #[sol(rpc)]
    contract RatingFactory {
        function creationFee() external view returns (uint256);
        function promoteFee() external view returns (uint256);
        function getItemsCount() external view returns (uint256);
        function getItem(uint256 id) external view returns (
            address item,
            address creator,
            uint8 min,
            uint8 max,
            string name,
            string description,
            bool isPromoted,
            uint256 promoteExpiry
        );
        function createItem(string name, string description, uint8 minScore, uint8 maxScore)
            external payable returns (address, uint256);
        function promoteItem(uint256 id) external payable;
    }
}

/// Decoded `RatingFactory.getItem`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryItem {
    pub id: U256,
    pub item: Address,
    pub creator: Address,
    pub min: u8,
    pub max: u8,
    pub name: String,
    pub description: String,
    pub is_promoted: bool,
    pub promote_expiry: U256,
}

/// Read-only operations on a `PrivateVote` deployment
#[async_trait]
pub trait PrivateVoteRead {
    /// Number of options the poll was deployed with
    async fn num_options(&self) -> Result<u8>;

    /// Encrypted tally handle for one option. All zero until the first vote lands on it.
    async fn get_tally(&self, index: u8) -> Result<FixedBytes<32>>;
}

/// Write operations on a `PrivateVote` deployment
#[async_trait]
pub trait PrivateVoteWrite {
    /// Cast an encrypted vote. Argument order is `(handle, proof)`.
    async fn vote(&self, handle: FixedBytes<32>, proof: Bytes) -> Result<TransactionReceipt>;

    /// Grant `reader` the right to decrypt every tally
    async fn allow_all_to(&self, reader: Address, fee: U256) -> Result<TransactionReceipt>;
}

#[async_trait]
pub trait RatingItemRead {
    async fn get_sum(&self) -> Result<FixedBytes<32>>;
    async fn get_count(&self) -> Result<FixedBytes<32>>;
}

#[async_trait]
pub trait RatingItemWrite {
    /// Submit an encrypted score. Argument order is `(handle, proof)`.
    async fn rate(&self, handle: FixedBytes<32>, proof: Bytes) -> Result<TransactionReceipt>;

    /// Grant `reader` the right to decrypt sum and count
    async fn allow_all_to(&self, reader: Address, fee: U256) -> Result<TransactionReceipt>;
}

#[async_trait]
pub trait RatingFactoryRead {
    async fn creation_fee(&self) -> Result<U256>;
    async fn promote_fee(&self) -> Result<U256>;
    async fn items_count(&self) -> Result<U256>;
    async fn get_item(&self, id: U256) -> Result<FactoryItem>;
}

#[async_trait]
pub trait RatingFactoryWrite {
    async fn create_item(
        &self,
        name: String,
        description: String,
        min: u8,
        max: u8,
        fee: U256,
    ) -> Result<TransactionReceipt>;

    async fn promote_item(&self, id: U256, fee: U256) -> Result<TransactionReceipt>;
}

/// Generic type to represent different provider capabilities
pub trait ProviderType: Send + Sync + 'static {}

/// Marker type for read-only provider
#[derive(Clone)]
pub struct ReadOnly;
impl ProviderType for ReadOnly {}

/// Marker type for a provider carrying the signing wallet
#[derive(Clone)]
pub struct ReadWrite;
impl ProviderType for ReadWrite {}

/// A deployed contract bound to a provider. The marker decides which of the write traits are
/// available.
#[derive(Clone)]
pub struct ContractHandle<T: ProviderType> {
    pub provider: Arc<DynProvider>,
    pub contract_address: Address,
    /// Signing account, present for [`ReadWrite`]
    pub from: Option<Address>,
    _marker: PhantomData<T>,
}

impl ContractHandle<ReadOnly> {
    pub fn read_only(provider: Arc<DynProvider>, contract_address: Address) -> Self {
        Self {
            provider,
            contract_address,
            from: None,
            _marker: PhantomData,
        }
    }
}

impl ContractHandle<ReadWrite> {
    pub fn read_write(provider: Arc<DynProvider>, contract_address: Address, from: Address) -> Self {
        Self {
            provider,
            contract_address,
            from: Some(from),
            _marker: PhantomData,
        }
    }

    fn sender(&self) -> Result<Address> {
        match self.from {
            Some(from) => Ok(from),
            None => bail!("ReadWrite contract handle without a sender"),
        }
    }
}

impl<T: ProviderType> ContractHandle<T> {
    pub fn address(&self) -> &Address {
        &self.contract_address
    }
}

/// `PrivateVote` at a given address
#[derive(Clone)]
pub struct PrivateVoteContract<T: ProviderType>(pub ContractHandle<T>);

/// `RatingItem` at a given address
#[derive(Clone)]
pub struct RatingItemContract<T: ProviderType>(pub ContractHandle<T>);

/// `RatingFactory` at a given address
#[derive(Clone)]
pub struct RatingFactoryContract<T: ProviderType>(pub ContractHandle<T>);

fn ensure_success(label: &str, receipt: TransactionReceipt) -> Result<TransactionReceipt> {
    if !receipt.status() {
        bail!(
            "{}: execution reverted in tx {}",
            label,
            receipt.transaction_hash
        );
    }
    info!(tx = %receipt.transaction_hash, block = ?receipt.block_number, "{} confirmed", label);
    Ok(receipt)
}

#[async_trait]
impl<T: ProviderType> PrivateVoteRead for PrivateVoteContract<T> {
    async fn num_options(&self) -> Result<u8> {
        let h = &self.0;
        call_with_retry("numOptions", RETRYABLE_READ_ERRORS, move || async move {
            let contract = PrivateVote::new(h.contract_address, &*h.provider);
            Ok(contract.numOptions().call().await?)
        })
        .await
    }

    async fn get_tally(&self, index: u8) -> Result<FixedBytes<32>> {
        let h = &self.0;
        call_with_retry("getTally", RETRYABLE_READ_ERRORS, move || async move {
            let contract = PrivateVote::new(h.contract_address, &*h.provider);
            Ok(contract.getTally(index).call().await?)
        })
        .await
    }
}

#[async_trait]
impl PrivateVoteWrite for PrivateVoteContract<ReadWrite> {
    async fn vote(&self, handle: FixedBytes<32>, proof: Bytes) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;
        debug!(nonce, contract = %h.contract_address, "sending vote");

        let contract = PrivateVote::new(h.contract_address, &*h.provider);
        let receipt = contract
            .vote(handle, proof)
            .from(from)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("vote", receipt)
    }

    async fn allow_all_to(&self, reader: Address, fee: U256) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;

        let contract = PrivateVote::new(h.contract_address, &*h.provider);
        let receipt = contract
            .allowAllTo(reader)
            .from(from)
            .value(fee)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("allowAllTo", receipt)
    }
}

#[async_trait]
impl<T: ProviderType> RatingItemRead for RatingItemContract<T> {
    async fn get_sum(&self) -> Result<FixedBytes<32>> {
        let h = &self.0;
        call_with_retry("getSum", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingItem::new(h.contract_address, &*h.provider);
            Ok(contract.getSum().call().await?)
        })
        .await
    }

    async fn get_count(&self) -> Result<FixedBytes<32>> {
        let h = &self.0;
        call_with_retry("getCount", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingItem::new(h.contract_address, &*h.provider);
            Ok(contract.getCount().call().await?)
        })
        .await
    }
}

#[async_trait]
impl RatingItemWrite for RatingItemContract<ReadWrite> {
    async fn rate(&self, handle: FixedBytes<32>, proof: Bytes) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;
        debug!(nonce, contract = %h.contract_address, "sending rating");

        let contract = RatingItem::new(h.contract_address, &*h.provider);
        let receipt = contract
            .rate(handle, proof)
            .from(from)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("rate", receipt)
    }

    async fn allow_all_to(&self, reader: Address, fee: U256) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;

        let contract = RatingItem::new(h.contract_address, &*h.provider);
        let receipt = contract
            .allowAllTo(reader)
            .from(from)
            .value(fee)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("allowAllTo", receipt)
    }
}

#[async_trait]
impl<T: ProviderType> RatingFactoryRead for RatingFactoryContract<T> {
    async fn creation_fee(&self) -> Result<U256> {
        let h = &self.0;
        call_with_retry("creationFee", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingFactory::new(h.contract_address, &*h.provider);
            Ok(contract.creationFee().call().await?)
        })
        .await
    }

    async fn promote_fee(&self) -> Result<U256> {
        let h = &self.0;
        call_with_retry("promoteFee", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingFactory::new(h.contract_address, &*h.provider);
            Ok(contract.promoteFee().call().await?)
        })
        .await
    }

    async fn items_count(&self) -> Result<U256> {
        let h = &self.0;
        call_with_retry("getItemsCount", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingFactory::new(h.contract_address, &*h.provider);
            Ok(contract.getItemsCount().call().await?)
        })
        .await
    }

    async fn get_item(&self, id: U256) -> Result<FactoryItem> {
        let h = &self.0;
        let ret = call_with_retry("getItem", RETRYABLE_READ_ERRORS, move || async move {
            let contract = RatingFactory::new(h.contract_address, &*h.provider);
            Ok(contract.getItem(id).call().await?)
        })
        .await?;
        Ok(FactoryItem {
            id,
            item: ret.item,
            creator: ret.creator,
            min: ret.min,
            max: ret.max,
            name: ret.name,
            description: ret.description,
            is_promoted: ret.isPromoted,
            promote_expiry: ret.promoteExpiry,
        })
    }
}

#[async_trait]
impl RatingFactoryWrite for RatingFactoryContract<ReadWrite> {
    async fn create_item(
        &self,
        name: String,
        description: String,
        min: u8,
        max: u8,
        fee: U256,
    ) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;

        let contract = RatingFactory::new(h.contract_address, &*h.provider);
        let receipt = contract
            .createItem(name, description, min, max)
            .from(from)
            .value(fee)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("createItem", receipt)
    }

    async fn promote_item(&self, id: U256, fee: U256) -> Result<TransactionReceipt> {
        let h = &self.0;
        let from = h.sender()?;
        let _guard = NONCE_LOCK.lock().await;
        let nonce = next_pending_nonce(&*h.provider, from).await?;

        let contract = RatingFactory::new(h.contract_address, &*h.provider);
        let receipt = contract
            .promoteItem(id)
            .from(from)
            .value(fee)
            .nonce(nonce)
            .send()
            .await?
            .get_receipt()
            .await?;
        ensure_success("promoteItem", receipt)
    }
}
