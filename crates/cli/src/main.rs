// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use clap::Parser;
use cli::Cli;
use sealed_flows::FlowError;

mod cli;
mod context;
mod fees;
pub mod helpers;
mod rating;
mod rating_create;
mod rating_decrypt;
mod rating_grant;
mod rating_list;
mod rating_promote;
mod rating_rate;
mod vote;
mod vote_cast;
mod vote_grant;
mod vote_tallies;

#[tokio::main]
pub async fn main() {
    if let Err(err) = Cli::parse().execute().await {
        match err.downcast_ref::<FlowError>() {
            // cancellations stay silent
            Some(flow) => {
                if let Some(message) = flow.user_message() {
                    eprintln!("{message}");
                }
            }
            None => eprintln!("{:#}", err),
        }
        std::process::exit(1);
    }
}
