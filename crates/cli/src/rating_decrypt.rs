// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;
use sealed_flows::ScoreDomain;

use crate::context::Context;

pub async fn execute(ctx: &Context, item: Option<ValidAddress>) -> Result<()> {
    let address = ctx.item_address(item)?;
    let rating = ctx.open_rating_item(address, ScoreDomain::default())?;
    let summary = ctx.decrypt_flow()?.rating_summary(&rating).await?;

    println!("Sum: {}", summary.sum);
    println!("Count: {}", summary.count);
    println!("Average: {:.2}", summary.average());
    Ok(())
}
