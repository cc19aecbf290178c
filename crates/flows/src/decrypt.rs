// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    error::{ErrorKind, FlowError},
    fee::with_fee,
    grant_cache::GrantCache,
    guard::{ensure_chain, recheck, wallet_account, ChainPolicy},
    handle::{CiphertextHandle, DecryptedValue, Slot},
    status::{FlowStatus, StatusTracker},
    traits::{
        AccessGranter, AggregateSource, DecryptionChallenge, DecryptionClient, TxOutcome,
        UserDecryptRequest, Wallet,
    },
};
use alloy::primitives::{Address, Bytes};
use futures::future::try_join_all;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, instrument};

/// How long a read-intent signature stays valid
pub const DEFAULT_SIGNATURE_DURATION_DAYS: u64 = 10;

/// Whether a requester may read a contract's aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    NoAccess,
    Granted,
}

/// Decrypted sum and count of a rating item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub sum: u64,
    pub count: u64,
}

impl RatingSummary {
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.count as f64
    }
}

/// Obtains decryption grants and reads encrypted aggregates back as plaintext
pub struct DecryptFlow<D: ?Sized, W: ?Sized> {
    decryptor: Arc<D>,
    wallet: Arc<W>,
    policy: ChainPolicy,
    cache: Arc<GrantCache>,
    status: StatusTracker,
    access: Mutex<HashMap<(Address, Address), AccessState>>,
    signature_duration_days: u64,
}

impl<D, W> DecryptFlow<D, W>
where
    D: DecryptionClient + ?Sized,
    W: Wallet + ?Sized,
{
    pub fn new(decryptor: Arc<D>, wallet: Arc<W>, policy: ChainPolicy, cache: Arc<GrantCache>) -> Self {
        Self {
            decryptor,
            wallet,
            policy,
            cache,
            status: StatusTracker::new(),
            access: Mutex::new(HashMap::new()),
            signature_duration_days: DEFAULT_SIGNATURE_DURATION_DAYS,
        }
    }

    pub fn with_signature_duration(mut self, days: u64) -> Self {
        self.signature_duration_days = days;
        self
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Access as known to this client: granted in this session, or remembered in the cache
    pub fn access_state(&self, contract: Address, requester: Address) -> AccessState {
        let session = self
            .access
            .lock()
            .ok()
            .and_then(|a| a.get(&(contract, requester)).copied());
        match session {
            Some(state) => state,
            None if self
                .cache
                .is_granted(self.policy.required_chain_id, contract, requester) =>
            {
                AccessState::Granted
            }
            None => AccessState::NoAccess,
        }
    }

    fn mark_granted(&self, contract: Address, requester: Address) {
        if let Ok(mut access) = self.access.lock() {
            access.insert((contract, requester), AccessState::Granted);
        }
    }

    /// Pay the current fee and grant the connected account read access to every aggregate of
    /// `granter`
    #[instrument(skip_all, fields(contract = %granter.address()))]
    pub async fn grant<G>(&self, granter: &G) -> Result<TxOutcome, FlowError>
    where
        G: AccessGranter + ?Sized,
    {
        let guard = self.status.begin();
        ensure_chain(&*self.wallet, &self.policy, &guard).await?;
        let reader = wallet_account(&*self.wallet).await?;

        guard.set(FlowStatus::ReadingFee);
        let guard = &guard;
        let outcome = with_fee(
            || granter.grant_fee(),
            |fee| async move {
                // the payer and the reader must be the account checked above
                recheck(&*self.wallet, &self.policy, reader).await?;
                guard.set(FlowStatus::Granting);
                granter.grant(reader, fee).await
            },
        )
        .await?;

        let contract = granter.address();
        self.mark_granted(contract, reader);
        self.cache
            .record_granted(self.policy.required_chain_id, contract, reader);
        info!(%reader, tx = %outcome.tx_hash, "read access granted");
        Ok(outcome)
    }

    /// Decrypt one aggregate for `requester`, who must be the connected account
    pub async fn request_aggregate<S>(
        &self,
        source: &S,
        slot: Slot,
        requester: Address,
    ) -> Result<DecryptedValue, FlowError>
    where
        S: AggregateSource + ?Sized,
    {
        let mut values = self.decrypt_batch(source, &[slot], Some(requester)).await?;
        values
            .pop()
            .ok_or_else(|| FlowError::Validation("No value decrypted".to_string()))
    }

    /// Decrypt several aggregates of one contract under a single read signature
    pub async fn decrypt_slots<S>(
        &self,
        source: &S,
        slots: &[Slot],
    ) -> Result<Vec<DecryptedValue>, FlowError>
    where
        S: AggregateSource + ?Sized,
    {
        self.decrypt_batch(source, slots, None).await
    }

    /// Plaintext tally of every option, in option order
    pub async fn vote_tallies<S>(&self, source: &S) -> Result<Vec<u64>, FlowError>
    where
        S: AggregateSource + ?Sized,
    {
        let slots = source
            .slots()
            .await
            .map_err(|e| FlowError::from_collaborator("slots", e, ErrorKind::Network))?;
        let values = self.decrypt_slots(source, &slots).await?;
        Ok(values.into_iter().map(|v| v.value).collect())
    }

    pub async fn rating_summary<S>(&self, source: &S) -> Result<RatingSummary, FlowError>
    where
        S: AggregateSource + ?Sized,
    {
        let values = self.decrypt_slots(source, &[Slot::Sum, Slot::Count]).await?;
        match values.as_slice() {
            [sum, count] => Ok(RatingSummary {
                sum: sum.value,
                count: count.value,
            }),
            _ => Err(FlowError::Validation(
                "Expected sum and count aggregates".to_string(),
            )),
        }
    }

    #[instrument(skip_all, fields(contract = %source.address(), slots = slots.len()))]
    async fn decrypt_batch<S>(
        &self,
        source: &S,
        slots: &[Slot],
        requester: Option<Address>,
    ) -> Result<Vec<DecryptedValue>, FlowError>
    where
        S: AggregateSource + ?Sized,
    {
        let guard = self.status.begin();
        ensure_chain(&*self.wallet, &self.policy, &guard).await?;
        let account = wallet_account(&*self.wallet).await?;
        if let Some(requester) = requester {
            if requester != account {
                return Err(FlowError::Validation(format!(
                    "Decryption must be requested by the connected account {account}"
                )));
            }
        }
        let contract = source.address();

        let handles = try_join_all(slots.iter().map(|slot| source.handle_at(*slot)))
            .await
            .map_err(|e| FlowError::from_collaborator("read_handles", e, ErrorKind::Network))?;

        let needs_signature = handles.iter().any(|h| !h.is_sentinel());
        let signed = if needs_signature {
            guard.set(FlowStatus::AwaitingReadSignature);
            Some(self.sign_read_intent(contract, account).await?)
        } else {
            debug!("all handles are uninitialised; skipping signature");
            None
        };

        guard.set(FlowStatus::Decrypting);
        let values = try_join_all(slots.iter().zip(handles).map(|(slot, handle)| {
            self.decrypt_one(*slot, handle, contract, account, signed.as_ref())
        }))
        .await?;

        if needs_signature {
            self.mark_granted(contract, account);
        }
        Ok(values)
    }

    async fn sign_read_intent(
        &self,
        contract: Address,
        account: Address,
    ) -> Result<(DecryptionChallenge, Bytes), FlowError> {
        let public_key = self
            .decryptor
            .session_public_key()
            .await
            .map_err(|e| FlowError::from_collaborator("session_key", e, ErrorKind::Network))?;
        let challenge = DecryptionChallenge {
            public_key,
            contracts: vec![contract],
            chain_id: self.policy.required_chain_id,
            start_timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            duration_days: self.signature_duration_days,
        };

        recheck(&*self.wallet, &self.policy, account).await?;
        let signature = self
            .wallet
            .sign_read_request(&challenge)
            .await
            .map_err(|e| FlowError::from_collaborator("sign_read_request", e, ErrorKind::Wallet))?;
        Ok((challenge, signature))
    }

    async fn decrypt_one(
        &self,
        slot: Slot,
        handle: CiphertextHandle,
        contract: Address,
        requester: Address,
        signed: Option<&(DecryptionChallenge, Bytes)>,
    ) -> Result<DecryptedValue, FlowError> {
        let value = match signed {
            _ if handle.is_sentinel() => 0,
            None => 0,
            Some((challenge, signature)) => {
                let request = UserDecryptRequest {
                    handle,
                    contract,
                    requester,
                    signature: signature.clone(),
                    challenge: challenge.clone(),
                };
                self.decryptor
                    .user_decrypt(&request)
                    .await
                    .map_err(|e| FlowError::from_collaborator("user_decrypt", e, ErrorKind::Network))?
            }
        };
        debug!(%slot, "decrypted");
        Ok(DecryptedValue {
            slot,
            handle,
            requester,
            value,
        })
    }
}
