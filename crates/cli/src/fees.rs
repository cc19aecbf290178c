// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use sealed_flows::evm::EvmRatingFactory;
use sealed_flows::ItemRegistry;
use sealed_utils::format_fee;

use crate::context::Context;

pub async fn execute(ctx: &Context) -> Result<()> {
    let factory = EvmRatingFactory::new(&ctx.provider, ctx.config.chain().rating_factory()?)?;
    let (creation, promote) = tokio::try_join!(factory.creation_fee(), factory.promote_fee())?;

    println!("Creation fee: {} ETH", format_fee(creation));
    println!("Promote fee:  {} ETH", format_fee(promote));
    println!("Reveal fee:   {} ETH", format_fee(ctx.reveal_fee()?));
    Ok(())
}
