// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::telemetry::setup_tracing;
use crate::rating::{self, RatingCommands};
use crate::vote::{self, VoteCommands};
use crate::{context::Context, fees};
use anyhow::Result;
use clap::{command, ArgAction, Parser, Subcommand};
use sealed_config::validation::ValidUrl;
use sealed_config::{load_config, AppConfig};
use tracing::{info, instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "sealed")]
#[command(about = "Cast encrypted votes and ratings on an FHEVM chain and reveal the results", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Name of the chain entry to use. Defaults to `chain` in the config file.
    #[arg(long, global = true)]
    chain: Option<String>,

    #[command(subcommand)]
    command: Commands,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `sealed -vvv` will give you
    /// trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,

    /// Set the Open Telemetry collector grpc endpoint. Eg. http://localhost:4317
    #[arg(long = "otel", global = true)]
    pub otel: Option<ValidUrl>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;
        setup_tracing(&config, self.log_level())?;
        info!("Config loaded from: {:?}", config.config_file());

        match self.command {
            Commands::Vote { command } => vote::execute(command, &config).await?,
            Commands::Rating { command } => rating::execute(command, &config).await?,
            Commands::Fees => fees::execute(&Context::read_only(&config).await?).await?,
        }

        Ok(())
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        load_config(
            self.config.clone(),
            self.chain.clone(),
            self.otel.clone().map(Into::into),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Private poll commands
    Vote {
        #[command(subcommand)]
        command: VoteCommands,
    },

    /// Rating item commands
    Rating {
        #[command(subcommand)]
        command: RatingCommands,
    },

    /// Print the current creation, promotion and reveal fees
    Fees,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_maps_to_level() {
        let cli = Cli::parse_from(["sealed", "-vv", "fees"]);
        assert_eq!(cli.log_level(), Level::DEBUG);
        let cli = Cli::parse_from(["sealed", "-q", "fees"]);
        assert_eq!(cli.log_level(), Level::ERROR);
        assert!(Cli::try_parse_from(["sealed", "-q", "-v", "fees"]).is_err());
    }

    #[test]
    fn test_vote_cast_parses() {
        let cli = Cli::parse_from(["sealed", "--chain", "sepolia", "vote", "cast", "--index", "2"]);
        assert_eq!(cli.chain.as_deref(), Some("sepolia"));
        assert!(matches!(cli.command, Commands::Vote { .. }));
    }
}
