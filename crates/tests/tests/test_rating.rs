// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::*;
use sealed_flows::{
    AccessGranter, AccessState, ErrorKind, FlowError, FlowStatus, GrantCache, Leaderboard,
    Remedy, ScoreDomain,
};
use sealed_test_helpers::{ether, init_test_tracing, Harness, MOCK_CHAIN_ID};
use sealed_utils::{format_fee, parse_fee};
use std::sync::atomic::Ordering;
use tempfile::tempdir;

#[tokio::test]
async fn test_rate_grant_decrypt_average() -> Result<()> {
    init_test_tracing();
    let mut chain = Harness::new(2);
    let reveal_fee = parse_fee("0.0005")?;
    let item = chain.deploy_rating(ScoreDomain::default(), reveal_fee);
    let submit = chain.submit_flow(false);
    let decrypt = chain.decrypt_flow();
    let rater = chain.account(0);

    submit.submit_encrypted(&item, 5).await?;
    decrypt.grant(&item).await?;
    let summary = decrypt.rating_summary(&item).await?;
    assert_eq!((summary.sum, summary.count), (5, 1));
    assert_eq!(summary.average(), 5.0);

    chain.connect(1);
    submit.submit_encrypted(&item, 3).await?;

    // the grant covers the rewritten aggregates too
    chain.connect(0);
    assert_eq!(
        decrypt.access_state(AccessGranter::address(&item), rater),
        AccessState::Granted
    );
    let summary = decrypt.rating_summary(&item).await?;
    assert_eq!((summary.sum, summary.count), (8, 2));
    assert_eq!(summary.average(), 4.0);

    assert_eq!(chain.wallet.balance(rater), ether(10) - reveal_fee);
    Ok(())
}

#[tokio::test]
async fn test_rating_outside_item_range_fails_fast() -> Result<()> {
    let mut chain = Harness::new(1);
    let item = chain.deploy_rating(ScoreDomain::rating(1, 10)?, U256_ZERO);
    let submit = chain.submit_flow(false);

    for bad in [0, 11] {
        let err = submit.submit_encrypted(&item, bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    submit.submit_encrypted(&item, 10).await?;
    assert_eq!(chain.fhevm.encrypt_calls().await, 1);
    Ok(())
}

const U256_ZERO: alloy::primitives::U256 = alloy::primitives::U256::ZERO;

#[tokio::test]
async fn test_grant_uses_fee_read_at_call_time() -> Result<()> {
    let mut chain = Harness::new(1);
    let item = chain.deploy_rating(ScoreDomain::default(), parse_fee("0.001")?);
    let decrypt = chain.decrypt_flow();
    let account = chain.account(0);

    decrypt.grant(&item).await?;
    item.set_reveal_fee(parse_fee("0.002")?).await;
    assert_eq!(format_fee(item.grant_fee().await?), "0.002");
    decrypt.grant(&item).await?;

    assert_eq!(
        chain.wallet.balance(account),
        ether(10) - parse_fee("0.003")?
    );
    Ok(())
}

#[tokio::test]
async fn test_grant_without_funds_is_a_wallet_error() -> Result<()> {
    let mut chain = Harness::new(1);
    let item = chain.deploy_rating(ScoreDomain::default(), ether(100));
    let decrypt = chain.decrypt_flow();

    let err = decrypt.grant(&item).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Wallet);
    assert_eq!(err.remedy(), Some(Remedy::AddFunds));
    assert_eq!(decrypt.status().current(), FlowStatus::Idle);
    assert_eq!(
        decrypt.access_state(AccessGranter::address(&item), chain.account(0)),
        AccessState::NoAccess
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_read_signature_is_silent() -> Result<()> {
    let mut chain = Harness::new(1);
    let item = chain.deploy_rating(ScoreDomain::default(), U256_ZERO);
    let submit = chain.submit_flow(false);
    let decrypt = chain.decrypt_flow();

    submit.submit_encrypted(&item, 4).await?;
    decrypt.grant(&item).await?;
    chain.wallet.reject_signatures.store(true, Ordering::SeqCst);

    let err = decrypt.rating_summary(&item).await.unwrap_err();
    assert_eq!(err, FlowError::Cancelled);
    assert!(err.user_message().is_none());
    assert_eq!(chain.fhevm.decrypt_calls().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_grant_cache_survives_restart() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("grants.json");

    let mut chain = Harness::new(1).with_grant_cache(GrantCache::open(&path));
    let item = chain.deploy_rating(ScoreDomain::default(), U256_ZERO);
    chain.decrypt_flow().grant(&item).await?;

    let reopened = GrantCache::open(&path);
    assert!(reopened.is_granted(MOCK_CHAIN_ID, AccessGranter::address(&item), chain.account(0)));
    Ok(())
}

#[tokio::test]
async fn test_provisional_leaderboard_reconciles_to_decrypted_counts() -> Result<()> {
    let mut chain = Harness::new(1);
    let item = chain.deploy_rating(ScoreDomain::default(), U256_ZERO);
    let submit = chain.submit_flow(false);
    let mut board = Leaderboard::new(ScoreDomain::default());

    submit.submit_encrypted(&item, 4).await?;
    board.record_provisional(4)?;
    assert!(board.view().is_provisional);
    assert_eq!(board.view().total(), 1);

    board.reconcile(vec![0, 0, 0, 1, 0])?;
    let view = board.view();
    assert!(!view.is_provisional);
    assert_eq!(view.rows[3].count, 1);
    Ok(())
}
