// ABOUTME: Entry point for the Better Outlast II Launcher command-line tool.
// ABOUTME: Sets up logging, parses arguments, and hands off to the subcommand dispatcher.

mod catalog;
mod cli;
mod config;
mod keys;
mod launcher;
mod mods;
mod old_patch;
mod paths;
mod store;
mod update;

use clap::Parser;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    if let Err(e) = cli::run(args).await {
        tracing::error!("Fatal: {e}");
        std::process::exit(1);
    }
}
