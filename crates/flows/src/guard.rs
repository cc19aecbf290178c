// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Chain and account checks shared by every flow.

use crate::{
    error::{ErrorKind, FlowError},
    status::{FlowStatus, StatusGuard},
    traits::Wallet,
};
use alloy::primitives::Address;
use sealed_config::AppConfig;
use tracing::{info, warn};

/// Which chain a flow must run on and whether it may ask the wallet to move there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPolicy {
    pub required_chain_id: u64,
    pub auto_switch: bool,
}

impl ChainPolicy {
    pub fn new(required_chain_id: u64, auto_switch: bool) -> Self {
        Self {
            required_chain_id,
            auto_switch,
        }
    }
}

impl From<&AppConfig> for ChainPolicy {
    fn from(config: &AppConfig) -> Self {
        Self::new(config.chain().chain_id, config.auto_switch_chain())
    }
}

pub(crate) async fn wallet_chain<W: Wallet + ?Sized>(wallet: &W) -> Result<u64, FlowError> {
    wallet
        .chain_id()
        .await
        .map_err(|e| FlowError::from_collaborator("chain_id", e, ErrorKind::Wallet))
}

pub(crate) async fn wallet_account<W: Wallet + ?Sized>(wallet: &W) -> Result<Address, FlowError> {
    wallet
        .account()
        .await
        .map_err(|e| FlowError::from_collaborator("account", e, ErrorKind::Wallet))
}

/// Make sure the wallet is on the required chain, switching first when the policy allows it
pub(crate) async fn ensure_chain<W: Wallet + ?Sized>(
    wallet: &W,
    policy: &ChainPolicy,
    status: &StatusGuard,
) -> Result<(), FlowError> {
    let expected = policy.required_chain_id;
    let actual = wallet_chain(wallet).await?;
    if actual == expected {
        return Ok(());
    }
    if !policy.auto_switch {
        warn!(expected, actual, "wallet is on the wrong chain");
        return Err(FlowError::WrongNetwork { expected, actual });
    }

    info!(expected, actual, "asking wallet to switch chain");
    status.set(FlowStatus::SwitchingNetwork);
    if let Err(e) = wallet.switch_chain(expected).await {
        return match FlowError::from_collaborator("switch_chain", e, ErrorKind::Wallet) {
            FlowError::Cancelled => Err(FlowError::Cancelled),
            _ => Err(FlowError::WrongNetwork { expected, actual }),
        };
    }

    let actual = wallet_chain(wallet).await?;
    if actual != expected {
        return Err(FlowError::WrongNetwork { expected, actual });
    }
    Ok(())
}

/// Last check before a broadcast or signature. No switching here: a chain change this late means
/// the prepared ciphertexts may no longer be valid.
pub(crate) async fn recheck<W: Wallet + ?Sized>(
    wallet: &W,
    policy: &ChainPolicy,
    account: Address,
) -> Result<(), FlowError> {
    let expected = policy.required_chain_id;
    let actual = wallet_chain(wallet).await?;
    if actual != expected {
        warn!(expected, actual, "chain changed mid-flow");
        return Err(FlowError::WrongNetwork { expected, actual });
    }
    let current = wallet_account(wallet).await?;
    if current != account {
        warn!(before = %account, after = %current, "account changed mid-flow");
        return Err(FlowError::AccountChanged {
            before: account,
            after: current,
        });
    }
    Ok(())
}
