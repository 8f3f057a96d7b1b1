//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gamedb_catalog::Provider;

#[derive(Parser)]
#[command(name = "gamedb")]
#[command(about = "Resolve, merge and deduplicate game download listings", long_about = None)]
pub(crate) struct Cli {
    /// Database path (defaults to the configured or platform data path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Settings file to read instead of the default config path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Resolve listings that have no canonical record yet
    Organize {
        /// Maximum number of listings to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Remove listings that share a content locator, keeping the earliest
    Deduplicate,

    /// Resolve a raw title against the provider chain without saving
    Resolve {
        /// Title as scraped (e.g., "Hades v1.38 [FitGirl Repack]")
        name: String,
    },

    /// Attach a listing to the record for a provider identity
    Link {
        /// Listing ID
        #[arg(long)]
        listing: i64,

        /// Provider name (igdb, steam, gog)
        #[arg(long)]
        provider: Provider,

        /// External ID in that provider's catalog
        #[arg(long)]
        id: u64,
    },

    /// Rebuild a record's metadata from a provider, keeping its listings
    Refresh {
        /// Record ID
        #[arg(long)]
        record: i64,

        /// Provider name (igdb, steam, gog)
        #[arg(long)]
        provider: Provider,

        /// External ID in that provider's catalog
        #[arg(long)]
        id: u64,
    },

    /// Search canonical records by name or alias
    Search {
        /// Text to look for
        query: String,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Records per page
        #[arg(long, default_value_t = 20)]
        page_size: usize,
    },

    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show current settings and where each value came from
    Show,

    /// Print the config file path
    Path,
}
