// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_config::validation::ValidAddress;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::context::Context;

pub async fn execute(
    ctx: &Context,
    search: Option<String>,
    factory: Option<ValidAddress>,
) -> Result<()> {
    let catalog = ctx.catalog(factory.map(Into::into))?;
    catalog.refresh().await?;
    let items = match search {
        Some(query) => catalog.search(&query).await,
        None => catalog.items().await,
    };

    if items.is_empty() {
        println!("No items");
        return Ok(());
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    for item in items {
        let star = if item.is_promoted_at(now) { "*" } else { " " };
        println!(
            "{star} #{:<4} {}  {:<24} [{}]  {}",
            item.id, item.address, item.name, item.domain, item.description
        );
    }
    Ok(())
}
