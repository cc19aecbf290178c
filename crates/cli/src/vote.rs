// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use anyhow::Result;
use clap::Subcommand;
use sealed_config::validation::ValidAddress;
use sealed_config::AppConfig;

use crate::context::Context;
use crate::{vote_cast, vote_grant, vote_tallies};

#[derive(Subcommand, Debug)]
pub enum VoteCommands {
    /// Cast an encrypted vote for a zero based option index
    Cast {
        #[arg(long)]
        index: u32,
        /// Poll address. Defaults to `contracts.private_vote` of the chain.
        #[arg(long)]
        address: Option<ValidAddress>,
    },

    /// Grant your account read access to the current tallies
    Grant {
        #[arg(long)]
        address: Option<ValidAddress>,
    },

    /// Decrypt and print every tally
    Tallies {
        #[arg(long)]
        address: Option<ValidAddress>,
    },
}

pub async fn execute(command: VoteCommands, config: &AppConfig) -> Result<()> {
    let ctx = Context::signing(config).await?;
    match command {
        VoteCommands::Cast { index, address } => vote_cast::execute(&ctx, index, address).await?,
        VoteCommands::Grant { address } => vote_grant::execute(&ctx, address).await?,
        VoteCommands::Tallies { address } => vote_tallies::execute(&ctx, address).await?,
    };

    Ok(())
}
