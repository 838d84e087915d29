//! Command-line interface definition and dispatch for ugc-agent.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; the image generation run lives in the
//! [`generate`] submodule.

mod generate;

use crate::{config, output};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

/// Top-level CLI structure for ugc-agent.
#[derive(Parser)]
#[command(
    name = "ugc",
    about = "Turn a person photo and a product photo into four UGC-style images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Which decision function drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Planner {
    /// Ask a language model for each step
    Llm,
    /// Follow a fixed plan without any model
    Planned,
}

/// Available subcommands for the ugc CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate four images from an intent and two photos
    Generate(GenerateArgs),
    /// Print the tool definitions given to the decision model
    Tools,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// What the images should show, e.g. "holding the bottle on a beach"
    pub intent: Vec<String>,
    /// Photo of the person (JPEG or PNG)
    #[arg(long)]
    pub person: PathBuf,
    /// Photo of the product (JPEG or PNG)
    #[arg(long)]
    pub product: PathBuf,
    /// Use the built-in intent when none is given
    #[arg(long)]
    pub default_intent: bool,
    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Iteration budget (overrides config)
    #[arg(long)]
    pub max_iterations: Option<usize>,
    /// Decision function to use
    #[arg(long, value_enum, default_value_t = Planner::Llm)]
    pub planner: Planner,
    /// Provider for the decision model (aiml, anthropic, openai, openrouter)
    #[arg(short, long)]
    pub provider: Option<String>,
    /// Decision model (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,
    /// Write the run transcript as JSON to this path
    #[arg(long)]
    pub transcript: Option<PathBuf>,
    /// Print every tool call and result
    #[arg(short, long)]
    pub verbose: bool,
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => generate::handle_generate(args).await,
        Commands::Tools => {
            let config = config::Config::load()?;
            let registry = generate::build_registry(&config)?;
            output::print_tool_definitions(&registry.definitions())
        }
        Commands::Config { action } => {
            let config = config::Config::load()?;
            match action {
                ConfigAction::Show => {
                    let path = config::Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let toml_str = toml::to_string_pretty(&config)?;
                    println!("{}", toml_str);
                }
            }
            Ok(())
        }
    }
}
