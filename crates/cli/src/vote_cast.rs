// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;
use sealed_flows::EncryptedEntrypoint;

use crate::context::Context;

pub async fn execute(ctx: &Context, index: u32, address: Option<ValidAddress>) -> Result<()> {
    let poll = ctx.poll(address).await?;
    let submission = ctx.submit_flow()?.submit_encrypted(&poll, index).await?;

    println!(
        "Voted for option {} (options {}) on {}",
        index,
        EncryptedEntrypoint::domain(&poll),
        submission.contract
    );
    println!("tx: {}", submission.outcome.tx_hash);
    Ok(())
}
