// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::error::{ErrorKind, FlowError};
use alloy::primitives::U256;
use sealed_utils::{format_ether, format_fee};
use std::future::Future;
use tracing::info;

/// Read the current fee, then run `action` with exactly that amount attached.
///
/// The fee is read on every call and never cached, so a fee changed on-chain between two actions
/// is always picked up.
pub async fn with_fee<T, R, RF, A, AF>(fee_read: R, action: A) -> Result<T, FlowError>
where
    R: FnOnce() -> RF,
    RF: Future<Output = anyhow::Result<U256>>,
    A: FnOnce(U256) -> AF,
    AF: Future<Output = anyhow::Result<T>>,
{
    let fee = fee_read()
        .await
        .map_err(|e| FlowError::from_collaborator("fee_read", e, ErrorKind::Network))?;
    info!(fee = %format_fee(fee), exact = %format_ether(fee), "attaching fee");
    action(fee)
        .await
        .map_err(|e| FlowError::from_collaborator("fee_action", e, ErrorKind::Contract))
}
