//! metaportal CLI - index lifecycle and search from the command line
//!
//! # Examples
//!
//! ```bash
//! # Search a target
//! metaportal search main coastal erosion --fields title,creator
//!
//! # Build the alternate index of a target and switch to it
//! metaportal rebuild main records.jsonl
//!
//! # Check every physical index, repairing corrupt ones
//! metaportal check '*' --fix
//! ```

use clap::Parser;
use metaportal::cli::output::print_error;
use metaportal::cli::{run, Cli, LogFormat};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays parseable
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metaportal=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
