//! RP Translator CLI
//!
//! Talks to `rptd` over its Unix socket; a few commands also work without
//! the daemon.

use clap::Parser;
use rptctl::cli::Cli;
use rptctl::commands::{self, CommandContext};
use rptctl::output;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr so translated text on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext::from_cli(&cli);
    if let Err(e) = commands::run(cli.command, ctx).await {
        output::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
