// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    contracts::{MockPrivateVote, MockRatingItem},
    fhevm::MockFhevm,
    wallet::MockWallet,
};
use alloy::{
    primitives::{Address, U256},
    signers::local::PrivateKeySigner,
};
use anyhow::Result;
use sealed_flows::{ChainPolicy, DecryptFlow, GrantCache, ScoreDomain, SubmitFlow};
use std::sync::Arc;

pub const MOCK_CHAIN_ID: u64 = 11155111;

/// One ether, for funding test accounts
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u64))
}

/// A mock chain with a few funded accounts and one connected wallet
pub struct Harness {
    pub fhevm: MockFhevm,
    pub wallet: Arc<MockWallet>,
    pub accounts: Vec<PrivateKeySigner>,
    pub grant_cache: Arc<GrantCache>,
    next_contract: u8,
}

impl Harness {
    pub fn new(accounts: usize) -> Self {
        let accounts: Vec<PrivateKeySigner> =
            (0..accounts.max(1)).map(|_| PrivateKeySigner::random()).collect();
        let wallet = Arc::new(MockWallet::new(MOCK_CHAIN_ID, accounts[0].clone()));
        for account in &accounts {
            wallet.fund(account.address(), ether(10));
        }
        Self {
            fhevm: MockFhevm::new(MOCK_CHAIN_ID),
            wallet,
            accounts,
            grant_cache: Arc::new(GrantCache::in_memory()),
            next_contract: 0,
        }
    }

    pub fn with_grant_cache(mut self, cache: GrantCache) -> Self {
        self.grant_cache = Arc::new(cache);
        self
    }

    pub fn account(&self, i: usize) -> Address {
        self.accounts[i].address()
    }

    /// Connect the wallet to account `i`
    pub fn connect(&self, i: usize) {
        self.wallet.connect(&self.accounts[i]);
    }

    fn contract_address(&mut self) -> Address {
        self.next_contract += 1;
        Address::repeat_byte(0xc0 + self.next_contract)
    }

    pub fn deploy_vote(&mut self, options: u8) -> Result<MockPrivateVote> {
        let address = self.contract_address();
        MockPrivateVote::deploy(address, options, self.fhevm.clone(), self.wallet.clone())
    }

    pub fn deploy_rating(&mut self, domain: ScoreDomain, reveal_fee: U256) -> MockRatingItem {
        let address = self.contract_address();
        MockRatingItem::deploy(
            address,
            domain,
            reveal_fee,
            self.fhevm.clone(),
            self.wallet.clone(),
        )
    }

    pub fn policy(&self, auto_switch: bool) -> ChainPolicy {
        ChainPolicy::new(MOCK_CHAIN_ID, auto_switch)
    }

    pub fn submit_flow(&self, auto_switch: bool) -> SubmitFlow<MockFhevm, MockWallet> {
        SubmitFlow::new(
            Arc::new(self.fhevm.clone()),
            self.wallet.clone(),
            self.policy(auto_switch),
        )
    }

    pub fn decrypt_flow(&self) -> DecryptFlow<MockFhevm, MockWallet> {
        DecryptFlow::new(
            Arc::new(self.fhevm.clone()),
            self.wallet.clone(),
            self.policy(false),
            self.grant_cache.clone(),
        )
    }
}

/// Install a test subscriber once. Output is captured by the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
