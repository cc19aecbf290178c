// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::*;
use sealed_flows::{AccessState, AggregateSource, CiphertextHandle, FlowError, FlowStatus, Remedy, Slot};
use sealed_test_helpers::{init_test_tracing, Harness, MOCK_CHAIN_ID};
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_fresh_poll_reads_zero_without_decrypting() -> Result<()> {
    init_test_tracing();
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(3)?;
    let decrypt = chain.decrypt_flow();

    assert_eq!(decrypt.vote_tallies(&poll).await?, vec![0, 0, 0]);
    assert_eq!(chain.fhevm.decrypt_calls().await, 0);
    assert_eq!(chain.wallet.signature_requests.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn test_two_voters_then_grant_and_decrypt() -> Result<()> {
    init_test_tracing();
    let mut chain = Harness::new(2);
    let poll = chain.deploy_vote(3)?;
    let submit = chain.submit_flow(false);
    let decrypt = chain.decrypt_flow();
    let (alice, bob) = (chain.account(0), chain.account(1));

    chain.connect(0);
    let first = submit.submit_encrypted(&poll, 1).await?;
    assert_eq!(first.submitter, alice);

    chain.connect(1);
    let second = submit.submit_encrypted(&poll, 2).await?;
    assert_eq!(second.submitter, bob);
    assert_ne!(first.handle, second.handle);

    // aggregates exist but alice holds no grant on them yet
    chain.connect(0);
    let denied = decrypt
        .request_aggregate(&poll, Slot::Tally(1), alice)
        .await
        .unwrap_err();
    assert_eq!(denied.remedy(), Some(Remedy::RequestGrant));

    decrypt.grant(&poll).await?;
    assert_eq!(decrypt.access_state(AggregateSource::address(&poll), alice), AccessState::Granted);
    assert_eq!(decrypt.vote_tallies(&poll).await?, vec![0, 1, 1]);

    let one = decrypt.request_aggregate(&poll, Slot::Tally(2), alice).await?;
    assert_eq!(one.value, 1);
    assert_eq!(one.requester, alice);

    // later votes rewrite every tally, alice keeps read access without granting again
    chain.connect(1);
    submit.submit_encrypted(&poll, 0).await?;
    chain.connect(0);
    assert_eq!(decrypt.vote_tallies(&poll).await?, vec![1, 1, 1]);
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_vote_is_rejected_locally() -> Result<()> {
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(3)?;
    let submit = chain.submit_flow(false);

    let err = submit.submit_encrypted(&poll, 3).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)));
    assert_eq!(chain.fhevm.encrypt_calls().await, 0);
    assert_eq!(poll.handle_at(Slot::Tally(0)).await?, CiphertextHandle::SENTINEL);
    Ok(())
}

#[tokio::test]
async fn test_identical_votes_use_distinct_inputs() -> Result<()> {
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(2)?;
    let submit = chain.submit_flow(false);

    let a = submit.submit_encrypted(&poll, 0).await?;
    let b = submit.submit_encrypted(&poll, 0).await?;
    assert_eq!(chain.fhevm.encrypt_calls().await, 2);
    assert_ne!(a.handle, b.handle);
    assert_ne!(a.outcome.tx_hash, b.outcome.tx_hash);
    Ok(())
}

#[tokio::test]
async fn test_wrong_chain_stops_before_encryption() -> Result<()> {
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(2)?;
    let submit = chain.submit_flow(false);
    chain.wallet.set_chain(1);

    let err = submit.submit_encrypted(&poll, 1).await.unwrap_err();
    assert_eq!(err.remedy(), Some(Remedy::SwitchChain(MOCK_CHAIN_ID)));
    assert!(err.user_message().is_some());
    assert_eq!(chain.fhevm.encrypt_calls().await, 0);
    assert_eq!(submit.status().current(), FlowStatus::Idle);
    Ok(())
}

#[tokio::test]
async fn test_auto_switch_moves_wallet_then_votes() -> Result<()> {
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(2)?;
    let submit = chain.submit_flow(true);
    chain.wallet.set_chain(1);

    submit.submit_encrypted(&poll, 1).await?;
    assert_eq!(chain.fhevm.encrypt_calls().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_vote_leaves_no_trace() -> Result<()> {
    let mut chain = Harness::new(1);
    let poll = chain.deploy_vote(2)?;
    let submit = chain.submit_flow(false);
    chain.wallet.reject_transactions.store(true, Ordering::SeqCst);

    let err = submit.submit_encrypted(&poll, 1).await.unwrap_err();
    assert_eq!(err, FlowError::Cancelled);
    assert!(err.user_message().is_none());
    assert_eq!(submit.status().current(), FlowStatus::Idle);
    assert_eq!(poll.handle_at(Slot::Tally(1)).await?, CiphertextHandle::SENTINEL);
    Ok(())
}
