//! Command line argument parsing
//!
//! Subcommands:
//! - `simulate`: Replay a script of timed submissions and print the dispatch timeline
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default user configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mudcq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Priority-ordered, time-paced command queue for MUD automation")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (skips discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a simulation script against the queue
    Simulate {
        /// Path to the TOML simulation script
        script: PathBuf,
        /// Simulated clock step in milliseconds
        #[arg(long = "step-ms", default_value_t = 50)]
        step_ms: u64,
        /// Stop after this many simulated seconds
        #[arg(long = "max-secs", default_value_t = 600.0)]
        max_secs: f64,
        /// Print the report as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
    /// Write the default configuration to ~/.mudcq/config.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long = "force")]
        force: bool,
    },
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Default log filter for the selected verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "mudcq=debug" } else { "mudcq=info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let args = Args::try_parse_from(["mudcq", "simulate", "run.toml", "--step-ms", "10", "--json", "-v"]).unwrap();

        assert!(args.verbose);
        assert_eq!(args.log_filter(), "mudcq=debug");
        match args.command {
            Commands::Simulate {
                script,
                step_ms,
                max_secs,
                json,
            } => {
                assert_eq!(script, PathBuf::from("run.toml"));
                assert_eq!(step_ms, 10);
                assert_eq!(max_secs, 600.0);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::try_parse_from(["mudcq", "show-config", "--config", "custom.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(args.command, Commands::ShowConfig));
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Args::try_parse_from(["mudcq"]).is_err());
    }
}
