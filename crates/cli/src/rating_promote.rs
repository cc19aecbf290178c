// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;

use crate::context::Context;

pub async fn execute(
    ctx: &Context,
    item: Option<ValidAddress>,
    factory: Option<ValidAddress>,
) -> Result<()> {
    let address = ctx.item_address(item)?;
    let outcome = ctx.catalog(factory.map(Into::into))?.promote(address).await?;

    println!("Promoted {}. tx: {}", address, outcome.tx_hash);
    Ok(())
}
