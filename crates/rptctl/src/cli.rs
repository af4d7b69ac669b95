//! CLI - Command-line argument parsing
//!
//! Argument definitions only; execution lives in `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RP Translator CLI
#[derive(Parser, Debug)]
#[command(name = "rptctl")]
#[command(about = "RP Translator - translate roleplay chat selections", long_about = None)]
#[command(version = env!("RPT_VERSION"))]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Path to daemon socket (overrides $RPT_SOCKET and the config file)
    #[arg(long, global = true)]
    pub socket: Option<String>,

    /// Config file (overrides $RPT_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Translate the current selection in place (bind this to a hotkey)
    Trigger,

    /// Translate TEXT and print the result
    Translate {
        text: String,

        /// Run the pipeline in this process instead of the daemon
        #[arg(long)]
        local: bool,

        /// Style for this run only
        #[arg(long, requires = "local")]
        style: Option<String>,
    },

    /// Show how TEXT would be split into command, mode and body
    Classify { text: String },

    /// Set the translation style (clears the cache when it changes)
    Style { name: String },

    /// Turn translation on
    Enable,

    /// Turn translation off (triggers are ignored)
    Disable,

    /// Manage the translation cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Show recent translations
    Logs {
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: usize,
    },

    /// Show daemon status
    Status {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Ping daemon (hidden - for health checks only)
    #[command(hide = true)]
    Ping,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CacheCommands {
    /// Remove every cached translation (history is kept)
    Clear,
}
