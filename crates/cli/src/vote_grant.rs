// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;

use crate::context::Context;

pub async fn execute(ctx: &Context, address: Option<ValidAddress>) -> Result<()> {
    let poll = ctx.poll(address).await?;
    let outcome = ctx.decrypt_flow()?.grant(&poll).await?;

    println!("Read access granted. tx: {}", outcome.tx_hash);
    Ok(())
}
