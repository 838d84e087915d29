//! Entry point for ugc-agent, a tool-calling agent that turns an intent plus
//! a person photo and a product photo into four UGC-style images.
//!
//! This binary loads environment variables, sets up logging, parses CLI
//! arguments via [`cli`], and dispatches to the appropriate subcommand handler.

mod agent;
mod cli;
mod clients;
mod config;
mod constants;
mod coordinator;
mod decision;
mod error;
mod image;
mod output;
mod storage;
mod tools;
mod transcript;

#[cfg(test)]
mod testing;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs the ugc CLI.
///
/// Loads `.env` files (silently ignored if absent), installs a stderr log
/// subscriber filtered by `RUST_LOG`, parses command-line arguments into a
/// [`cli::Cli`] struct, and dispatches the chosen subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ugc=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::parse();
    cli::run(cli).await
}
