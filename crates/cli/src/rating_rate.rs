// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;
use sealed_flows::ScoreDomain;

use crate::context::Context;

pub async fn execute(
    ctx: &Context,
    item: Option<ValidAddress>,
    score: u32,
    factory: Option<ValidAddress>,
) -> Result<()> {
    let address = ctx.item_address(item)?;
    let rating = match ctx.catalog(factory.map(Into::into)) {
        Ok(catalog) => ctx.rating_item(&catalog, address).await?,
        // no factory configured: the item is rated against the default range
        Err(_) => ctx.open_rating_item(address, ScoreDomain::default())?,
    };
    let submission = ctx.submit_flow()?.submit_encrypted(&rating, score).await?;

    println!("Rated!");
    println!("tx: {}", submission.outcome.tx_hash);
    Ok(())
}
