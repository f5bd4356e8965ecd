//! Command-line interface for skywatch.
//!
//! This module provides the CLI structure for the `skywatch` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{CacheCommand, ConfigCommand, WatchCommand};

/// skywatch - Live aircraft positions for a map region
///
/// Keeps a view of the aircraft inside a bounding box up to date, serving
/// cached data while fresh and refreshing it in the background.
#[derive(Debug, Parser)]
#[command(name = "skywatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch a region and print the live view
    Watch(WatchCommand),

    /// Inspect or clear the local cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Cache(CacheCommand::Show),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "skywatch");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_watch_negative_bounds() {
        let args = [
            "skywatch", "watch", "--north", "44", "--south", "36", "--east", "3.5", "--west",
            "-9.5", "--callsign", "IBE",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let Command::Watch(watch) = cli.command else {
            panic!("Expected watch command");
        };
        assert!((watch.west - -9.5).abs() < f64::EPSILON);
        assert_eq!(watch.callsign.as_deref(), Some("IBE"));
        assert!(!watch.json);
    }

    #[test]
    fn test_parse_watch_requires_bounds() {
        assert!(Cli::try_parse_from(["skywatch", "watch", "--north", "1"]).is_err());
    }

    #[test]
    fn test_parse_cache_status_json() {
        let cli = Cli::try_parse_from(["skywatch", "cache", "status", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Cache(CacheCommand::Status { json: true })
        ));
    }

    #[test]
    fn test_parse_cache_clear() {
        let cli = Cli::try_parse_from(["skywatch", "cache", "clear"]).unwrap();
        assert!(matches!(cli.command, Command::Cache(CacheCommand::Clear)));
    }

    #[test]
    fn test_parse_with_config() {
        let args = ["skywatch", "-c", "/custom/config.toml", "config", "path"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["skywatch", "cache", "show", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["skywatch", "cache", "show", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
