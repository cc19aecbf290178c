// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! In-memory collaborators for unit tests.

use crate::{
    domain::ScoreDomain,
    handle::{CiphertextHandle, EncryptedInput, EncryptionRequest, Slot},
    traits::*,
};
use alloy::primitives::{Address, Bytes, FixedBytes, B256, U256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Arc, Mutex,
    },
};

pub const CHAIN: u64 = 31337;

fn tx(n: u64) -> TxOutcome {
    TxOutcome {
        tx_hash: B256::with_last_byte(n as u8),
        block_number: Some(n),
    }
}

pub struct FakeWallet {
    account: Mutex<Address>,
    chain: AtomicU64,
    pub refuse_switch: AtomicBool,
    pub reject_signature: AtomicBool,
    pub switch_calls: AtomicU32,
    pub sign_calls: AtomicU32,
}

impl Default for FakeWallet {
    fn default() -> Self {
        Self {
            account: Mutex::new(Address::repeat_byte(0xa1)),
            chain: AtomicU64::new(CHAIN),
            refuse_switch: AtomicBool::new(false),
            reject_signature: AtomicBool::new(false),
            switch_calls: AtomicU32::new(0),
            sign_calls: AtomicU32::new(0),
        }
    }
}

impl FakeWallet {
    pub fn current_account(&self) -> Address {
        *self.account.lock().unwrap()
    }

    pub fn set_account(&self, account: Address) {
        *self.account.lock().unwrap() = account;
    }

    pub fn set_chain(&self, chain: u64) {
        self.chain.store(chain, Ordering::SeqCst);
    }
}

#[async_trait]
impl Wallet for FakeWallet {
    async fn account(&self) -> Result<Address> {
        Ok(self.current_account())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse_switch.load(Ordering::SeqCst) {
            bail!("Unrecognized chain ID");
        }
        self.set_chain(chain_id);
        Ok(())
    }

    async fn sign_read_request(&self, challenge: &DecryptionChallenge) -> Result<Bytes> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_signature.load(Ordering::SeqCst) {
            bail!("User rejected the request.");
        }
        Ok(Bytes::from(challenge.public_key.to_vec()))
    }
}

#[derive(Default)]
pub struct FakeEncryptor {
    pub calls: AtomicU32,
    last: Mutex<Option<EncryptedInput>>,
    switch_account: Mutex<Option<(Arc<FakeWallet>, Address)>>,
}

impl FakeEncryptor {
    pub fn last_input(&self) -> Option<EncryptedInput> {
        self.last.lock().unwrap().clone()
    }

    pub fn on_encrypt_switch_to(&self, wallet: Arc<FakeWallet>, account: Address) {
        *self.switch_account.lock().unwrap() = Some((wallet, account));
    }
}

#[async_trait]
impl EncryptionClient for FakeEncryptor {
    async fn encrypt(&self, request: &EncryptionRequest) -> Result<EncryptedInput> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((wallet, account)) = self.switch_account.lock().unwrap().take() {
            wallet.set_account(account);
        }
        let input = EncryptedInput {
            contract: request.contract,
            submitter: request.submitter,
            handles: vec![CiphertextHandle(FixedBytes::with_last_byte(n as u8))],
            proof: Bytes::from(vec![n as u8; 4]),
        };
        *self.last.lock().unwrap() = Some(input.clone());
        Ok(input)
    }
}

pub struct FakeTarget {
    address: Address,
    domain: ScoreDomain,
    submitted: Mutex<Vec<(CiphertextHandle, Bytes)>>,
    failure: Mutex<Option<String>>,
}

impl FakeTarget {
    pub fn new(domain: ScoreDomain) -> Self {
        Self {
            address: Address::repeat_byte(0xc0),
            domain,
            submitted: Mutex::new(vec![]),
            failure: Mutex::new(None),
        }
    }

    pub fn submitted(&self) -> Vec<(CiphertextHandle, Bytes)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fail_with(&self, msg: &str) {
        *self.failure.lock().unwrap() = Some(msg.to_string());
    }
}

#[async_trait]
impl EncryptedEntrypoint for FakeTarget {
    fn address(&self) -> Address {
        self.address
    }

    fn domain(&self) -> ScoreDomain {
        self.domain
    }

    async fn submit(&self, handle: CiphertextHandle, proof: Bytes) -> Result<TxOutcome> {
        if let Some(msg) = self.failure.lock().unwrap().clone() {
            bail!(msg);
        }
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push((handle, proof));
        Ok(tx(submitted.len() as u64))
    }
}

/// Aggregates with fixed handles, and a decryptor that knows their plaintexts
pub struct FakeAggregates {
    address: Address,
    handles: Vec<(Slot, CiphertextHandle)>,
    pub fee: U256,
    pub grants: Mutex<Vec<(Address, U256)>>,
    on_fee_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeAggregates {
    pub fn new(handles: Vec<(Slot, CiphertextHandle)>) -> Self {
        Self {
            address: Address::repeat_byte(0xd0),
            handles,
            fee: U256::ZERO,
            grants: Mutex::new(vec![]),
            on_fee_read: Mutex::new(None),
        }
    }

    /// Run `f` once, while the fee is being read
    pub fn on_fee_read(&self, f: impl FnOnce() + Send + 'static) {
        *self.on_fee_read.lock().unwrap() = Some(Box::new(f));
    }
}

#[async_trait]
impl AggregateSource for FakeAggregates {
    fn address(&self) -> Address {
        self.address
    }

    async fn slots(&self) -> Result<Vec<Slot>> {
        Ok(self.handles.iter().map(|(s, _)| *s).collect())
    }

    async fn handle_at(&self, slot: Slot) -> Result<CiphertextHandle> {
        match self.handles.iter().find(|(s, _)| *s == slot) {
            Some((_, h)) => Ok(*h),
            None => bail!("no such slot {slot}"),
        }
    }
}

#[async_trait]
impl AccessGranter for FakeAggregates {
    fn address(&self) -> Address {
        self.address
    }

    async fn grant_fee(&self) -> Result<U256> {
        let hook = self.on_fee_read.lock().unwrap().take();
        if let Some(f) = hook {
            f();
        }
        Ok(self.fee)
    }

    async fn grant(&self, reader: Address, fee: U256) -> Result<TxOutcome> {
        let mut grants = self.grants.lock().unwrap();
        grants.push((reader, fee));
        Ok(tx(grants.len() as u64))
    }
}

#[derive(Default)]
pub struct FakeDecryptor {
    pub plaintexts: HashMap<CiphertextHandle, u64>,
    pub calls: AtomicU32,
}

#[async_trait]
impl DecryptionClient for FakeDecryptor {
    async fn session_public_key(&self) -> Result<Bytes> {
        Ok(Bytes::from_static(&[0x04, 0x01]))
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.plaintexts.get(&request.handle) {
            Some(v) => Ok(*v),
            None => bail!("handle {} is not authorized for decryption", request.handle),
        }
    }
}

pub fn handle(n: u8) -> CiphertextHandle {
    CiphertextHandle(FixedBytes::repeat_byte(n))
}
