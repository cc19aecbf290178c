// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Flow collaborators backed by deployed contracts.

use crate::{
    catalog::{CatalogItem, NewItem},
    domain::ScoreDomain,
    handle::{CiphertextHandle, Slot},
    traits::{
        AccessGranter, AggregateSource, DecryptionChallenge, EncryptedEntrypoint, ItemRegistry,
        TxOutcome, Wallet,
    },
};
use alloy::{
    primitives::{Address, Bytes, B256, U256},
    rpc::types::TransactionReceipt,
    signers::{local::PrivateKeySigner, SignerSync},
    sol,
    sol_types::{eip712_domain, SolStruct},
};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use sealed_evm_helpers::{
    EthProvider, FactoryItem, PrivateVoteContract, PrivateVoteRead, PrivateVoteWrite,
    RatingFactoryContract, RatingFactoryRead, RatingFactoryWrite, RatingItemContract,
    RatingItemRead, RatingItemWrite, ReadOnly, ReadWrite,
};
use tracing::info;

pub const DECRYPTION_DOMAIN_NAME: &str = "Decryption";
pub const DECRYPTION_DOMAIN_VERSION: &str = "1";

sol! {
    #[derive(Debug)]
    struct UserDecryptRequestVerification {
        bytes publicKey;
        address[] contractAddresses;
        uint256 startTimestamp;
        uint256 durationDays;
    }
}

fn outcome(receipt: &TransactionReceipt) -> TxOutcome {
    TxOutcome {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
    }
}

fn writer<'a, T>(writer: &'a Option<T>, address: Address) -> Result<&'a T> {
    writer
        .as_ref()
        .ok_or_else(|| anyhow!("Contract {address} was opened without a signing wallet"))
}

/// A `PrivateVote` poll
pub struct EvmPrivateVote {
    address: Address,
    reader: PrivateVoteContract<ReadOnly>,
    writer: Option<PrivateVoteContract<ReadWrite>>,
    options: u8,
}

impl EvmPrivateVote {
    /// Open the poll and read its option count
    pub async fn connect(provider: &EthProvider, address: Address) -> Result<Self> {
        let reader = provider.private_vote(address);
        let options = reader
            .num_options()
            .await
            .with_context(|| format!("Failed to read numOptions of {address}"))?;
        if options == 0 {
            bail!("Poll {address} has no options");
        }
        let writer = match provider.signer() {
            Some(_) => Some(provider.private_vote_writer(address)?),
            None => None,
        };
        Ok(Self {
            address,
            reader,
            writer,
            options,
        })
    }

    pub fn options(&self) -> u8 {
        self.options
    }
}

#[async_trait]
impl EncryptedEntrypoint for EvmPrivateVote {
    fn address(&self) -> Address {
        self.address
    }

    fn domain(&self) -> ScoreDomain {
        ScoreDomain {
            min: 0,
            max: self.options as u32 - 1,
        }
    }

    async fn submit(&self, handle: CiphertextHandle, proof: Bytes) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .vote(handle.as_bytes32(), proof)
            .await?;
        Ok(outcome(&receipt))
    }
}

#[async_trait]
impl AggregateSource for EvmPrivateVote {
    fn address(&self) -> Address {
        self.address
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok((0..self.options).map(Slot::Tally).collect())
    }

    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle> {
        match slot {
            Slot::Tally(i) if i < self.options => Ok(self.reader.get_tally(i).await?.into()),
            other => bail!("Poll {} has no aggregate {other}", self.address),
        }
    }
}

#[async_trait]
impl AccessGranter for EvmPrivateVote {
    fn address(&self) -> Address {
        self.address
    }

    /// Poll results are free to unlock
    async fn grant_fee(&self) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .allow_all_to(reader, fee)
            .await?;
        Ok(outcome(&receipt))
    }
}

/// A `RatingItem`. Its score range comes from the factory listing.
pub struct EvmRatingItem {
    address: Address,
    reader: RatingItemContract<ReadOnly>,
    writer: Option<RatingItemContract<ReadWrite>>,
    domain: ScoreDomain,
    reveal_fee: U256,
}

impl EvmRatingItem {
    pub fn new(
        provider: &EthProvider,
        address: Address,
        domain: ScoreDomain,
        reveal_fee: U256,
    ) -> Result<Self> {
        let writer = match provider.signer() {
            Some(_) => Some(provider.rating_item_writer(address)?),
            None => None,
        };
        Ok(Self {
            address,
            reader: provider.rating_item(address),
            writer,
            domain,
            reveal_fee,
        })
    }
}

#[async_trait]
impl EncryptedEntrypoint for EvmRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    fn domain(&self) -> ScoreDomain {
        self.domain
    }

    async fn submit(&self, handle: CiphertextHandle, proof: Bytes) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .rate(handle.as_bytes32(), proof)
            .await?;
        Ok(outcome(&receipt))
    }
}

#[async_trait]
impl AggregateSource for EvmRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok(vec![Slot::Sum, Slot::Count])
    }

    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle> {
        match slot {
            Slot::Sum => Ok(self.reader.get_sum().await?.into()),
            Slot::Count => Ok(self.reader.get_count().await?.into()),
            other => bail!("Rating item {} has no aggregate {other}", self.address),
        }
    }
}

#[async_trait]
impl AccessGranter for EvmRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    /// The item exposes no fee view, so the configured reveal fee is used
    async fn grant_fee(&self) -> Result<U256> {
        Ok(self.reveal_fee)
    }

    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .allow_all_to(reader, fee)
            .await?;
        Ok(outcome(&receipt))
    }
}

pub struct EvmRatingFactory {
    address: Address,
    reader: RatingFactoryContract<ReadOnly>,
    writer: Option<RatingFactoryContract<ReadWrite>>,
}

impl EvmRatingFactory {
    pub fn new(provider: &EthProvider, address: Address) -> Result<Self> {
        let writer = match provider.signer() {
            Some(_) => Some(provider.rating_factory_writer(address)?),
            None => None,
        };
        Ok(Self {
            address,
            reader: provider.rating_factory(address),
            writer,
        })
    }
}

impl TryFrom<FactoryItem> for CatalogItem {
    type Error = anyhow::Error;

    fn try_from(item: FactoryItem) -> Result<Self> {
        Ok(CatalogItem {
            id: u64::try_from(item.id).context("item id does not fit in u64")?,
            address: item.item,
            creator: item.creator,
            domain: ScoreDomain::rating(item.min, item.max)?,
            name: item.name,
            description: item.description,
            promoted: item.is_promoted,
            promote_expiry: item.promote_expiry.saturating_to(),
        })
    }
}

#[async_trait]
impl ItemRegistry for EvmRatingFactory {
    fn address(&self) -> Address {
        self.address
    }

    async fn items_count(&self) -> Result<u64> {
        let count = self.reader.items_count().await?;
        u64::try_from(count).context("item count does not fit in u64")
    }

    async fn item(&self, id: u64) -> Result<CatalogItem> {
        self.reader.get_item(U256::from(id)).await?.try_into()
    }

    async fn creation_fee(&self) -> Result<U256> {
        self.reader.creation_fee().await
    }

    async fn promote_fee(&self) -> Result<U256> {
        self.reader.promote_fee().await
    }

    async fn create_item(&self, item: &NewItem, fee: U256) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .create_item(
                item.name.clone(),
                item.description.clone(),
                item.min,
                item.max,
                fee,
            )
            .await?;
        Ok(outcome(&receipt))
    }

    async fn promote_item(&self, id: u64, fee: U256) -> Result<TxOutcome> {
        let receipt = writer(&self.writer, self.address)?
            .promote_item(U256::from(id), fee)
            .await?;
        Ok(outcome(&receipt))
    }
}

/// EIP-712 digest of a read intent, as checked by the decryption verifier contract
pub fn read_intent_hash(challenge: &DecryptionChallenge, verifying_contract: Address) -> B256 {
    let domain = eip712_domain! {
        name: DECRYPTION_DOMAIN_NAME,
        version: DECRYPTION_DOMAIN_VERSION,
        chain_id: challenge.chain_id,
        verifying_contract: verifying_contract,
    };
    let message = UserDecryptRequestVerification {
        publicKey: challenge.public_key.clone(),
        contractAddresses: challenge.contracts.clone(),
        startTimestamp: U256::from(challenge.start_timestamp),
        durationDays: U256::from(challenge.duration_days),
    };
    message.eip712_signing_hash(&domain)
}

/// A wallet holding a raw private key. It stays on whatever chain its RPC points to.
pub struct LocalWallet {
    provider: EthProvider,
    signer: PrivateKeySigner,
    verifying_contract: Address,
}

impl LocalWallet {
    pub fn new(provider: EthProvider, signer: PrivateKeySigner, verifying_contract: Address) -> Self {
        Self {
            provider,
            signer,
            verifying_contract,
        }
    }
}

#[async_trait]
impl Wallet for LocalWallet {
    async fn account(&self) -> Result<Address> {
        Ok(self.signer.address())
    }

    async fn chain_id(&self) -> Result<u64> {
        self.provider.chain_id().await
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        bail!("wrong network: a key-based wallet cannot switch to chain {chain_id}, select a chain whose rpc_url serves it")
    }

    async fn sign_read_request(&self, challenge: &DecryptionChallenge) -> Result<Bytes> {
        let hash = read_intent_hash(challenge, self.verifying_contract);
        let sig = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| anyhow!("Failed to sign read request: {e}"))?;
        info!(account = %self.signer.address(), "read request signed");
        Ok(Bytes::from(sig.as_bytes().to_vec()))
    }
}
