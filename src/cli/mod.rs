//! CLI adapter for metaportal
//!
//! Exposes the request-serving and administration operations of
//! `core/` on the command line. Depends on `core/`; `core/` never
//! depends on it.
//!
//! ```text
//!  +------------------+      +------------------+
//!  |      cli/        | ---> |     core/        |
//!  | (clap adapter)   |      |  (domain logic)  |
//!  +------------------+      +------------------+
//! ```

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

/// metaportal - metadata index lifecycle and search
///
/// Query logical targets, repoint them at rebuilt physical indexes and
/// check or repair index integrity.
#[derive(Parser, Debug)]
#[command(name = "metaportal")]
#[command(version)]
#[command(about = "Metadata index lifecycle and search", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub format: OutputFormat,

    /// Log line format on stderr
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file (overrides METAPORTAL_CONFIG and XDG lookup)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Log format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search a logical target
    Search(commands::SearchArgs),

    /// Check physical indexes and optionally repair them
    Check(commands::CheckArgs),

    /// Point a target at one or more physical indexes
    Swap(commands::SwapArgs),

    /// Build a target's alternate physical index from records and switch to it
    Rebuild(commands::RebuildArgs),

    /// List targets and the physical indexes they point at
    Aliases(commands::AliasesArgs),

    /// Show current configuration
    #[command(name = "show-config")]
    ShowConfig(commands::ConfigArgs),

    /// Generate shell completion scripts
    ///
    /// Output completion script to stdout. To install:
    ///
    ///   bash:  metaportal completions bash > ~/.local/share/bash-completion/completions/metaportal
    ///   zsh:   metaportal completions zsh > ~/.zfunc/_metaportal
    ///   fish:  metaportal completions fish > ~/.config/fish/completions/metaportal.fish
    Completions(commands::CompletionsArgs),
}

/// Run the CLI with the provided arguments
pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use crate::core::config::Config;
    use crate::core::services::Services;
    use crate::core::xdg::XdgDirs;
    use std::sync::Arc;

    // Handle completions command early (doesn't need services)
    if let Commands::Completions(args) = cli.command {
        return commands::completions::execute(args);
    }

    let xdg = XdgDirs::new();

    // Load configuration
    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.merge_env();
            config.validate()?;
            config
        }
        None => Config::load_with_xdg(&xdg)?,
    };
    config.log_config();

    // Create services
    let services = Arc::new(Services::new(config)?);

    // Execute command
    match cli.command {
        Commands::Search(args) => commands::search::execute(args, &services, cli.format).await,
        Commands::Check(args) => commands::check::execute(args, &services, cli.format).await,
        Commands::Swap(args) => commands::alias::execute_swap(args, &services, cli.format).await,
        Commands::Rebuild(args) => commands::rebuild::execute(args, &services, cli.format).await,
        Commands::Aliases(args) => {
            commands::alias::execute_list(args, &services, cli.format).await
        }
        Commands::ShowConfig(args) => commands::config::execute(args, &services, cli.format).await,
        Commands::Completions(_) => unreachable!(), // Handled above
    }
}
