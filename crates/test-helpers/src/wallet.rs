// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::fhevm::MOCK_DECRYPTION_VERIFIER;
use alloy::{
    primitives::{Address, Bytes, U256},
    signers::{local::PrivateKeySigner, SignerSync},
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use sealed_flows::{evm::read_intent_hash, DecryptionChallenge, Wallet};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Mutex,
    },
};
use tracing::debug;

/// A browser-style wallet: the user can switch accounts and chains under a running flow and can
/// reject any prompt.
pub struct MockWallet {
    signer: Mutex<PrivateKeySigner>,
    chain_id: AtomicU64,
    balances: Mutex<HashMap<Address, U256>>,
    pub reject_signatures: AtomicBool,
    pub reject_transactions: AtomicBool,
    pub refuse_switch: AtomicBool,
    pub signature_requests: AtomicU32,
}

impl MockWallet {
    pub fn new(chain_id: u64, signer: PrivateKeySigner) -> Self {
        Self {
            signer: Mutex::new(signer),
            chain_id: AtomicU64::new(chain_id),
            balances: Mutex::new(HashMap::new()),
            reject_signatures: AtomicBool::new(false),
            reject_transactions: AtomicBool::new(false),
            refuse_switch: AtomicBool::new(false),
            signature_requests: AtomicU32::new(0),
        }
    }

    /// Select another account
    pub fn connect(&self, signer: &PrivateKeySigner) {
        if let Ok(mut current) = self.signer.lock() {
            *current = signer.clone();
        }
    }

    pub fn current_account(&self) -> Address {
        self.signer
            .lock()
            .map(|s| s.address())
            .unwrap_or(Address::ZERO)
    }

    pub fn set_chain(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn fund(&self, account: Address, amount: U256) {
        if let Ok(mut balances) = self.balances.lock() {
            *balances.entry(account).or_default() += amount;
        }
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.balances
            .lock()
            .ok()
            .and_then(|b| b.get(&account).copied())
            .unwrap_or_default()
    }

    /// Approve a transaction from the current account and debit `value`. Returns the sender.
    pub fn approve_transaction(&self, value: U256) -> Result<Address> {
        if self.reject_transactions.load(Ordering::SeqCst) {
            bail!("MetaMask Tx Signature: User rejected the request.");
        }
        let sender = self.current_account();
        let mut balances = self
            .balances
            .lock()
            .map_err(|_| anyhow!("wallet state poisoned"))?;
        let balance = balances.entry(sender).or_default();
        if *balance < value {
            bail!("insufficient funds for gas * price + value: have {balance} want {value}");
        }
        *balance -= value;
        debug!(%sender, %value, "transaction approved");
        Ok(sender)
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn account(&self) -> Result<Address> {
        Ok(self.current_account())
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        if self.refuse_switch.load(Ordering::SeqCst) {
            bail!("User rejected the request to switch to chain {chain_id}");
        }
        self.set_chain(chain_id);
        Ok(())
    }

    async fn sign_read_request(&self, challenge: &DecryptionChallenge) -> Result<Bytes> {
        self.signature_requests.fetch_add(1, Ordering::SeqCst);
        if self.reject_signatures.load(Ordering::SeqCst) {
            bail!("User denied message signature.");
        }
        let signer = self
            .signer
            .lock()
            .map_err(|_| anyhow!("wallet state poisoned"))?
            .clone();
        let hash = read_intent_hash(challenge, MOCK_DECRYPTION_VERIFIER);
        let sig = signer.sign_hash_sync(&hash)?;
        Ok(Bytes::from(sig.as_bytes().to_vec()))
    }
}
