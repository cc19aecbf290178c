// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! `PrivateVote` and `RatingItem` as the contracts compute them, on top of [`MockFhevm`].

use crate::{fhevm::MockFhevm, wallet::MockWallet};
use alloy::primitives::{keccak256, Address, Bytes, U256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use sealed_flows::{
    AccessGranter, AggregateSource, CiphertextHandle, EncryptedEntrypoint, ScoreDomain, Slot,
    TxOutcome,
};
use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::Mutex;
use tracing::info;

static TX_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Accounts holding a grant. A grant covers every later aggregate too, so each rewrite of an
/// aggregate re-allows these readers on the new handle.
#[derive(Default)]
struct Readers(Mutex<BTreeSet<Address>>);

impl Readers {
    async fn add(&self, reader: Address) {
        self.0.lock().await.insert(reader);
    }

    async fn allow_all(&self, fhevm: &MockFhevm, handles: &[CiphertextHandle]) {
        for reader in self.0.lock().await.iter() {
            for handle in handles {
                fhevm.allow(*handle, *reader).await;
            }
        }
    }
}

fn mined() -> TxOutcome {
    let n = TX_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
    TxOutcome {
        tx_hash: keccak256(n.to_be_bytes()),
        block_number: Some(n),
    }
}

pub struct MockPrivateVote {
    address: Address,
    fhevm: MockFhevm,
    wallet: Arc<MockWallet>,
    options: u8,
    tallies: Mutex<Vec<CiphertextHandle>>,
    readers: Readers,
}

impl MockPrivateVote {
    pub fn deploy(
        address: Address,
        options: u8,
        fhevm: MockFhevm,
        wallet: Arc<MockWallet>,
    ) -> Result<Self> {
        if options == 0 {
            bail!("a poll needs at least one option");
        }
        Ok(Self {
            address,
            fhevm,
            wallet,
            options,
            tallies: Mutex::new(vec![CiphertextHandle::SENTINEL; options as usize]),
            readers: Readers::default(),
        })
    }

    pub fn options(&self) -> u8 {
        self.options
    }
}

#[async_trait]
impl EncryptedEntrypoint for MockPrivateVote {
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
        let sender = self.wallet.approve_transaction(U256::ZERO)?;
        let choice = self
            .fhevm
            .verify_input(handle, &proof, self.address, sender)
            .await?;

        // Every tally is rewritten so the chosen option cannot be told apart on-chain
        let mut tallies = self.tallies.lock().await;
        for (option, tally) in tallies.iter_mut().enumerate() {
            let current = self.fhevm.peek(*tally).await?;
            let hit = u64::from(choice == option as u64);
            *tally = self.fhevm.store(current + hit).await;
        }
        self.readers.allow_all(&self.fhevm, &tallies).await;
        info!(%sender, "vote counted");
        Ok(mined())
    }
}

#[async_trait]
impl AggregateSource for MockPrivateVote {
    fn address(&self) -> Address {
        self.address
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok((0..self.options).map(Slot::Tally).collect())
    }

    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle> {
        let tallies = self.tallies.lock().await;
        match slot {
            Slot::Tally(i) if (i as usize) < tallies.len() => Ok(tallies[i as usize]),
            other => bail!("execution reverted: no aggregate {other}"),
        }
    }
}

#[async_trait]
impl AccessGranter for MockPrivateVote {
    fn address(&self) -> Address {
        self.address
    }

    async fn grant_fee(&self) -> Result<U256> {
        Ok(U256::ZERO)
    }

    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome> {
        self.wallet.approve_transaction(fee)?;
        self.readers.add(reader).await;
        let tallies = self.tallies.lock().await;
        self.readers.allow_all(&self.fhevm, &tallies).await;
        Ok(mined())
    }
}

pub struct MockRatingItem {
    address: Address,
    fhevm: MockFhevm,
    wallet: Arc<MockWallet>,
    domain: ScoreDomain,
    reveal_fee: Mutex<U256>,
    aggregates: Mutex<(CiphertextHandle, CiphertextHandle)>,
    readers: Readers,
}

impl MockRatingItem {
    pub fn deploy(
        address: Address,
        domain: ScoreDomain,
        reveal_fee: U256,
        fhevm: MockFhevm,
        wallet: Arc<MockWallet>,
    ) -> Self {
        Self {
            address,
            fhevm,
            wallet,
            domain,
            reveal_fee: Mutex::new(reveal_fee),
            aggregates: Mutex::new((CiphertextHandle::SENTINEL, CiphertextHandle::SENTINEL)),
            readers: Readers::default(),
        }
    }

    pub async fn set_reveal_fee(&self, fee: U256) {
        *self.reveal_fee.lock().await = fee;
    }
}

#[async_trait]
impl EncryptedEntrypoint for MockRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    fn domain(&self) -> ScoreDomain {
        self.domain
    }

    async fn submit(&self, handle: CiphertextHandle, proof: Bytes) -> Result<TxOutcome> {
        let sender = self.wallet.approve_transaction(U256::ZERO)?;
        let score = self
            .fhevm
            .verify_input(handle, &proof, self.address, sender)
            .await?;

        let mut aggregates = self.aggregates.lock().await;
        let (sum, count) = *aggregates;
        let sum = self.fhevm.store(self.fhevm.peek(sum).await? + score).await;
        let count = self.fhevm.store(self.fhevm.peek(count).await? + 1).await;
        *aggregates = (sum, count);
        self.readers.allow_all(&self.fhevm, &[sum, count]).await;
        info!(%sender, "rating counted");
        Ok(mined())
    }
}

#[async_trait]
impl AggregateSource for MockRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok(vec![Slot::Sum, Slot::Count])
    }

    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle> {
        let (sum, count) = *self.aggregates.lock().await;
        match slot {
            Slot::Sum => Ok(sum),
            Slot::Count => Ok(count),
            other => bail!("execution reverted: no aggregate {other}"),
        }
    }
}

#[async_trait]
impl AccessGranter for MockRatingItem {
    fn address(&self) -> Address {
        self.address
    }

    async fn grant_fee(&self) -> Result<U256> {
        Ok(*self.reveal_fee.lock().await)
    }

    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome> {
        let required = *self.reveal_fee.lock().await;
        if fee < required {
            bail!("execution reverted: Insufficient reveal fee");
        }
        self.wallet.approve_transaction(fee)?;
        self.readers.add(reader).await;
        let (sum, count) = *self.aggregates.lock().await;
        self.readers.allow_all(&self.fhevm, &[sum, count]).await;
        Ok(mined())
    }
}
