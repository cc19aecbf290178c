// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    error::{ErrorKind, FlowError},
    guard::{ensure_chain, recheck, wallet_account, ChainPolicy},
    handle::{CiphertextHandle, EncryptedInput, EncryptionRequest},
    status::{FlowStatus, StatusGuard, StatusTracker},
    traits::{EncryptedEntrypoint, EncryptionClient, TxOutcome, Wallet},
};
use alloy::primitives::Address;
use sealed_utils::short_hex;
use std::sync::Arc;
use tracing::{info, instrument};

/// A confirmed encrypted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub contract: Address,
    pub submitter: Address,
    pub handle: CiphertextHandle,
    pub outcome: TxOutcome,
}

/// Steps of encrypt-and-submit. Each transition is taken by [`SubmitFlow::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    Pending { value: u32 },
    Validated { value: u32 },
    Authorized { value: u32, submitter: Address },
    Encrypted { input: EncryptedInput },
    Submitted(Submission),
}

/// Encrypts a plaintext for the connected account and submits it to a contract entrypoint
pub struct SubmitFlow<E: ?Sized, W: ?Sized> {
    encryptor: Arc<E>,
    wallet: Arc<W>,
    policy: ChainPolicy,
    status: StatusTracker,
}

impl<E, W> SubmitFlow<E, W>
where
    E: EncryptionClient + ?Sized,
    W: Wallet + ?Sized,
{
    pub fn new(encryptor: Arc<E>, wallet: Arc<W>, policy: ChainPolicy) -> Self {
        Self {
            encryptor,
            wallet,
            policy,
            status: StatusTracker::new(),
        }
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    /// Run every step to completion and return the confirmed submission
    #[instrument(skip_all, fields(contract = %short_hex(target.address().as_slice())))]
    pub async fn submit_encrypted<T>(&self, target: &T, value: u32) -> Result<Submission, FlowError>
    where
        T: EncryptedEntrypoint + ?Sized,
    {
        // Range errors must surface before anything is awaited
        let mut state = Self::validate(target, SubmitState::Pending { value })?;

        let guard = self.status.begin();
        loop {
            state = match state {
                SubmitState::Submitted(submission) => return Ok(submission),
                other => self.step(target, other, &guard).await?,
            };
        }
    }

    /// Take a single transition
    pub async fn step<T>(
        &self,
        target: &T,
        state: SubmitState,
        guard: &StatusGuard,
    ) -> Result<SubmitState, FlowError>
    where
        T: EncryptedEntrypoint + ?Sized,
    {
        match state {
            SubmitState::Pending { .. } => Self::validate(target, state),
            SubmitState::Validated { value } => {
                ensure_chain(&*self.wallet, &self.policy, guard).await?;
                let submitter = wallet_account(&*self.wallet).await?;
                Ok(SubmitState::Authorized { value, submitter })
            }
            SubmitState::Authorized { value, submitter } => {
                guard.set(FlowStatus::Encrypting);
                let request = EncryptionRequest::new(target.address(), submitter).add32(value);
                let input = self
                    .encryptor
                    .encrypt(&request)
                    .await
                    .map_err(|e| FlowError::from_collaborator("encrypt", e, ErrorKind::Network))?;
                if !input.is_bound_to(target.address(), submitter) {
                    return Err(FlowError::Validation(
                        "Encrypted input is bound to a different contract or account".to_string(),
                    ));
                }
                Ok(SubmitState::Encrypted { input })
            }
            SubmitState::Encrypted { input } => {
                recheck(&*self.wallet, &self.policy, input.submitter).await?;
                let handle = input
                    .first_handle()
                    .map_err(|e| FlowError::from_collaborator("encrypt", e, ErrorKind::Network))?;

                guard.set(FlowStatus::AwaitingConfirmation);
                let outcome = target
                    .submit(handle, input.proof.clone())
                    .await
                    .map_err(|e| FlowError::from_collaborator("submit", e, ErrorKind::Contract))?;
                info!(tx = %outcome.tx_hash, "encrypted value submitted");
                Ok(SubmitState::Submitted(Submission {
                    contract: target.address(),
                    submitter: input.submitter,
                    handle,
                    outcome,
                }))
            }
            SubmitState::Submitted(_) => Ok(state),
        }
    }

    fn validate<T>(target: &T, state: SubmitState) -> Result<SubmitState, FlowError>
    where
        T: EncryptedEntrypoint + ?Sized,
    {
        match state {
            SubmitState::Pending { value } => {
                let value = target.domain().validate(value)?;
                Ok(SubmitState::Validated { value })
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::ScoreDomain,
        fakes::{FakeEncryptor, FakeTarget, FakeWallet, CHAIN},
    };
    use std::sync::atomic::Ordering;
    use tracing_test::traced_test;

    fn flow(
        wallet: Arc<FakeWallet>,
        auto_switch: bool,
    ) -> (Arc<FakeEncryptor>, SubmitFlow<FakeEncryptor, FakeWallet>) {
        let encryptor = Arc::new(FakeEncryptor::default());
        let flow = SubmitFlow::new(
            encryptor.clone(),
            wallet,
            ChainPolicy::new(CHAIN, auto_switch),
        );
        (encryptor, flow)
    }

    #[tokio::test]
    async fn test_out_of_range_never_encrypts() {
        let (encryptor, flow) = flow(Arc::new(FakeWallet::default()), false);
        let target = FakeTarget::new(ScoreDomain::vote(3).unwrap());

        let err = flow.submit_encrypted(&target, 3).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(_)));
        assert_eq!(encryptor.calls.load(Ordering::SeqCst), 0);
        assert!(target.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submits_first_handle_then_proof() -> anyhow::Result<()> {
        let wallet = Arc::new(FakeWallet::default());
        let (encryptor, flow) = flow(wallet.clone(), false);
        let target = FakeTarget::new(ScoreDomain::default());

        let submission = flow.submit_encrypted(&target, 4).await?;
        let submitted = target.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, submission.handle);
        assert_eq!(submitted[0].1, encryptor.last_input().unwrap().proof);
        assert_eq!(submission.submitter, wallet.current_account());
        assert_eq!(flow.status().current(), FlowStatus::Idle);
        assert!(flow
            .status()
            .recent()
            .ends_with(&[FlowStatus::Encrypting, FlowStatus::AwaitingConfirmation, FlowStatus::Idle]));
        Ok(())
    }

    #[tokio::test]
    async fn test_identical_inputs_encrypt_twice() -> anyhow::Result<()> {
        let (encryptor, flow) = flow(Arc::new(FakeWallet::default()), false);
        let target = FakeTarget::new(ScoreDomain::default());

        let a = flow.submit_encrypted(&target, 2).await?;
        let b = flow.submit_encrypted(&target, 2).await?;
        assert_eq!(encryptor.calls.load(Ordering::SeqCst), 2);
        assert_ne!(a.handle, b.handle);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_chain_halts_before_encryption() {
        let wallet = Arc::new(FakeWallet::default());
        wallet.set_chain(1);
        let (encryptor, flow) = flow(wallet, false);
        let target = FakeTarget::new(ScoreDomain::default());

        let err = flow.submit_encrypted(&target, 1).await.unwrap_err();
        assert_eq!(
            err,
            FlowError::WrongNetwork {
                expected: CHAIN,
                actual: 1
            }
        );
        assert_eq!(err.remedy(), Some(crate::Remedy::SwitchChain(CHAIN)));
        assert_eq!(encryptor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.status().current(), FlowStatus::Idle);
    }

    #[tokio::test]
    async fn test_auto_switch_then_submit() -> anyhow::Result<()> {
        let wallet = Arc::new(FakeWallet::default());
        wallet.set_chain(1);
        let (_, flow) = flow(wallet.clone(), true);
        let target = FakeTarget::new(ScoreDomain::default());

        flow.submit_encrypted(&target, 5).await?;
        assert_eq!(wallet.switch_calls.load(Ordering::SeqCst), 1);
        assert!(flow
            .status()
            .recent()
            .contains(&FlowStatus::SwitchingNetwork));
        Ok(())
    }

    #[tokio::test]
    async fn test_refused_switch_reports_wrong_network() {
        let wallet = Arc::new(FakeWallet::default());
        wallet.set_chain(1);
        wallet.refuse_switch.store(true, Ordering::SeqCst);
        let (encryptor, flow) = flow(wallet, true);
        let target = FakeTarget::new(ScoreDomain::default());

        let err = flow.submit_encrypted(&target, 5).await.unwrap_err();
        assert!(matches!(err, FlowError::WrongNetwork { .. }));
        assert_eq!(encryptor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_account_change_before_broadcast_aborts() {
        let wallet = Arc::new(FakeWallet::default());
        let (encryptor, flow) = flow(wallet.clone(), false);
        let target = FakeTarget::new(ScoreDomain::default());
        // the wallet switches accounts while encryption is in flight
        encryptor.on_encrypt_switch_to(wallet.clone(), Address::repeat_byte(0x77));

        let err = flow.submit_encrypted(&target, 3).await.unwrap_err();
        assert!(matches!(err, FlowError::AccountChanged { .. }));
        assert!(target.submitted().is_empty());
    }

    #[traced_test]
    #[tokio::test]
    async fn test_rejected_transaction_is_cancellation() {
        let (_, flow) = flow(Arc::new(FakeWallet::default()), false);
        let target = FakeTarget::new(ScoreDomain::default());
        target.fail_with("User rejected the request.");

        let err = flow.submit_encrypted(&target, 3).await.unwrap_err();
        assert_eq!(err, FlowError::Cancelled);
        assert!(err.user_message().is_none());
        assert_eq!(flow.status().current(), FlowStatus::Idle);
        assert!(logs_contain("cancelled by user"));
    }

    #[tokio::test]
    async fn test_steps_are_individually_testable() -> anyhow::Result<()> {
        let wallet = Arc::new(FakeWallet::default());
        let (_, flow) = flow(wallet.clone(), false);
        let target = FakeTarget::new(ScoreDomain::default());
        let guard = flow.status().begin();

        let state = flow
            .step(&target, SubmitState::Validated { value: 2 }, &guard)
            .await?;
        assert_eq!(
            state,
            SubmitState::Authorized {
                value: 2,
                submitter: wallet.current_account()
            }
        );
        let state = flow.step(&target, state, &guard).await?;
        let SubmitState::Encrypted { input } = &state else {
            panic!("expected encrypted state");
        };
        assert!(input.is_bound_to(target.address(), wallet.current_account()));
        assert!(target.submitted().is_empty());
        Ok(())
    }
}
