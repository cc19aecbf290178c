// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! A stand-in for the coprocessor, its ACL and the relayer in front of it.
//!
//! Ciphertexts are plaintexts behind random-looking handles. Everything the real system checks
//! before releasing a value is checked here too: input proofs are bound to one contract and one
//! submitter and can be used once, and user decryption requires both a valid read-intent
//! signature and an ACL entry for the exact handle.

use alloy::primitives::{keccak256, Address, Bytes, Signature, B256};
use anyhow::{bail, Result};
use async_trait::async_trait;
use sealed_flows::{
    evm::read_intent_hash, CiphertextHandle, DecryptionClient, EncryptedInput, EncryptionClient,
    EncryptionRequest, UserDecryptRequest,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Verifying contract for read-intent signatures on the mock chain
pub const MOCK_DECRYPTION_VERIFIER: Address = Address::new([0x5e; 20]);

#[derive(Debug, Clone)]
struct InputBinding {
    contract: Address,
    submitter: Address,
    proof: Bytes,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    plaintexts: HashMap<CiphertextHandle, u64>,
    acl: HashSet<(CiphertextHandle, Address)>,
    bindings: HashMap<CiphertextHandle, InputBinding>,
    consumed: HashSet<CiphertextHandle>,
    encrypt_calls: u64,
    decrypt_calls: u64,
}

#[derive(Debug, Clone)]
pub struct MockFhevm {
    chain_id: u64,
    state: Arc<RwLock<State>>,
}

impl MockFhevm {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn next_handle(state: &mut State) -> CiphertextHandle {
        state.next_id += 1;
        let mut seed = b"sealed-mock-fhevm".to_vec();
        seed.extend_from_slice(&state.next_id.to_be_bytes());
        CiphertextHandle(keccak256(seed))
    }

    /// Store a computed value under a new handle, as an FHE operation would
    pub async fn store(&self, value: u64) -> CiphertextHandle {
        let mut state = self.state.write().await;
        let handle = Self::next_handle(&mut state);
        state.plaintexts.insert(handle, value);
        trace!(%handle, "stored ciphertext");
        handle
    }

    /// Plaintext behind a handle. The sentinel reads as zero, like an uninitialised value.
    pub async fn peek(&self, handle: CiphertextHandle) -> Result<u64> {
        if handle.is_sentinel() {
            return Ok(0);
        }
        match self.state.read().await.plaintexts.get(&handle) {
            Some(v) => Ok(*v),
            None => bail!("unknown ciphertext handle {handle}"),
        }
    }

    pub async fn allow(&self, handle: CiphertextHandle, reader: Address) {
        if handle.is_sentinel() {
            return;
        }
        self.state.write().await.acl.insert((handle, reader));
    }

    pub async fn is_allowed(&self, handle: CiphertextHandle, reader: Address) -> bool {
        self.state.read().await.acl.contains(&(handle, reader))
    }

    /// Check an external input the way `FHE.fromExternal` does and return its plaintext
    pub async fn verify_input(
        &self,
        handle: CiphertextHandle,
        proof: &Bytes,
        contract: Address,
        sender: Address,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(binding) = state.bindings.get(&handle).cloned() else {
            bail!("execution reverted: InvalidInputHandle");
        };
        if binding.contract != contract || binding.submitter != sender {
            bail!("execution reverted: InvalidSigner");
        }
        if &binding.proof != proof {
            bail!("execution reverted: InvalidInputProof");
        }
        if !state.consumed.insert(handle) {
            bail!("execution reverted: InputAlreadyUsed");
        }
        match state.plaintexts.get(&handle) {
            Some(v) => Ok(*v),
            None => bail!("execution reverted: InvalidInputHandle"),
        }
    }

    pub async fn encrypt_calls(&self) -> u64 {
        self.state.read().await.encrypt_calls
    }

    pub async fn decrypt_calls(&self) -> u64 {
        self.state.read().await.decrypt_calls
    }
}

fn input_proof(contract: Address, submitter: Address, handles: &[CiphertextHandle]) -> Bytes {
    let mut preimage = Vec::with_capacity(40 + handles.len() * 32);
    preimage.extend_from_slice(contract.as_slice());
    preimage.extend_from_slice(submitter.as_slice());
    for h in handles {
        preimage.extend_from_slice(h.0.as_slice());
    }
    Bytes::from(keccak256(preimage).to_vec())
}

#[async_trait]
impl EncryptionClient for MockFhevm {
    async fn encrypt(&self, request: &EncryptionRequest) -> Result<EncryptedInput> {
        let mut state = self.state.write().await;
        state.encrypt_calls += 1;

        let mut handles = Vec::with_capacity(request.values.len());
        for v in &request.values {
            let handle = Self::next_handle(&mut state);
            state.plaintexts.insert(handle, v.0 as u64);
            handles.push(handle);
        }
        let proof = input_proof(request.contract, request.submitter, &handles);
        for handle in &handles {
            state.bindings.insert(
                *handle,
                InputBinding {
                    contract: request.contract,
                    submitter: request.submitter,
                    proof: proof.clone(),
                },
            );
        }
        debug!(contract = %request.contract, count = handles.len(), "encrypted input");
        Ok(EncryptedInput {
            contract: request.contract,
            submitter: request.submitter,
            handles,
            proof,
        })
    }
}

#[async_trait]
impl DecryptionClient for MockFhevm {
    async fn session_public_key(&self) -> Result<Bytes> {
        Ok(Bytes::from(B256::repeat_byte(0x04).to_vec()))
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<u64> {
        self.state.write().await.decrypt_calls += 1;

        let challenge = &request.challenge;
        if challenge.chain_id != self.chain_id {
            bail!("read request signed for chain {}", challenge.chain_id);
        }
        if !challenge.contracts.contains(&request.contract) {
            bail!("read request does not cover contract {}", request.contract);
        }
        let hash = read_intent_hash(challenge, MOCK_DECRYPTION_VERIFIER);
        let signer = Signature::try_from(request.signature.as_ref())?
            .recover_address_from_prehash(&hash)?;
        if signer != request.requester {
            bail!("read request signature does not match {}", request.requester);
        }
        if !self.is_allowed(request.handle, request.requester).await {
            bail!(
                "{} is not authorized to decrypt handle {}",
                request.requester,
                request.handle
            );
        }
        self.peek(request.handle).await
    }
}
