// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::{Context as _, Result};
use sealed_config::validation::ValidAddress;
use sealed_flows::NewItem;

use crate::context::Context;

pub async fn execute(
    ctx: &Context,
    name: String,
    description: String,
    min: u8,
    max: u8,
    factory: Option<ValidAddress>,
) -> Result<()> {
    let catalog = ctx.catalog(factory.map(Into::into))?;
    let outcome = catalog
        .create_item(NewItem {
            name,
            description,
            min,
            max,
        })
        .await?;

    // the factory appends, so the newest listing is ours
    let items = catalog.refresh().await?;
    let created = items
        .last()
        .context("Item was created but the factory lists no items")?;

    println!("RatingItem: {}", created.address);
    println!("tx: {}", outcome.tx_hash);
    Ok(())
}
