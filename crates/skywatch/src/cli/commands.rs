//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::error::Result;
use crate::filter::Filters;
use crate::model::Region;

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Northern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub north: f64,

    /// Southern latitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub south: f64,

    /// Eastern longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub east: f64,

    /// Western longitude bound
    #[arg(long, allow_negative_numbers = true)]
    pub west: f64,

    /// Only show callsigns starting with this prefix
    #[arg(long)]
    pub callsign: Option<String>,

    /// Only show aircraft whose origin country contains this text
    #[arg(long)]
    pub country: Option<String>,

    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Print each view as a JSON line
    #[arg(short, long)]
    pub json: bool,
}

impl WatchCommand {
    /// The region to watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the bounds do not form a valid region.
    pub fn region(&self) -> Result<Region> {
        Region::new(self.north, self.south, self.east, self.west)
    }

    /// Filters given on the command line, if any were given.
    #[must_use]
    pub fn filters(&self) -> Option<Filters> {
        if self.callsign.is_none() && self.country.is_none() {
            return None;
        }
        Some(Filters {
            callsign_prefix: self.callsign.clone().unwrap_or_default(),
            country_substring: self.country.clone().unwrap_or_default(),
        })
    }
}

/// Cache inspection commands.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show store location and size
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show each cached record with its age
    Show,

    /// Remove all cached records
    Clear,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
