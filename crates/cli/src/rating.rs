// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use clap::Subcommand;
use sealed_config::validation::ValidAddress;
use sealed_config::AppConfig;
use sealed_flows::{DEFAULT_RATING_MAX, DEFAULT_RATING_MIN};

use crate::context::Context;
use crate::{
    rating_create, rating_decrypt, rating_grant, rating_list, rating_promote, rating_rate,
};

#[derive(Subcommand, Debug)]
pub enum RatingCommands {
    /// Create a rating item through the factory, paying the creation fee
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long, default_value_t = DEFAULT_RATING_MIN)]
        min: u8,
        #[arg(long, default_value_t = DEFAULT_RATING_MAX)]
        max: u8,
        /// Factory address. Defaults to `contracts.rating_factory` of the chain.
        #[arg(long)]
        factory: Option<ValidAddress>,
    },

    /// Submit an encrypted score
    Rate {
        /// Item address. Defaults to `contracts.rating_item` of the chain.
        #[arg(long)]
        item: Option<ValidAddress>,
        #[arg(long)]
        score: u32,
        #[arg(long)]
        factory: Option<ValidAddress>,
    },

    /// Pay the reveal fee for read access to the sum and count
    Grant {
        #[arg(long)]
        item: Option<ValidAddress>,
    },

    /// Decrypt and print the sum, count and average
    Decrypt {
        #[arg(long)]
        item: Option<ValidAddress>,
    },

    /// Promote an item in the catalog, paying the promotion fee
    Promote {
        #[arg(long)]
        item: Option<ValidAddress>,
        #[arg(long)]
        factory: Option<ValidAddress>,
    },

    /// List catalog items, optionally filtered by name or description
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        factory: Option<ValidAddress>,
    },
}

pub async fn execute(command: RatingCommands, config: &AppConfig) -> Result<()> {
    // listing is a pure read and works without PRIVATE_KEY
    let ctx = match command {
        RatingCommands::List { .. } => Context::read_only(config).await?,
        _ => Context::signing(config).await?,
    };
    match command {
        RatingCommands::Create {
            name,
            desc,
            min,
            max,
            factory,
        } => rating_create::execute(&ctx, name, desc, min, max, factory).await?,
        RatingCommands::Rate {
            item,
            score,
            factory,
        } => rating_rate::execute(&ctx, item, score, factory).await?,
        RatingCommands::Grant { item } => rating_grant::execute(&ctx, item).await?,
        RatingCommands::Decrypt { item } => rating_decrypt::execute(&ctx, item).await?,
        RatingCommands::Promote { item, factory } => {
            rating_promote::execute(&ctx, item, factory).await?
        }
        RatingCommands::List { search, factory } => {
            rating_list::execute(&ctx, search, factory).await?
        }
    };

    Ok(())
}
