//! Completions command - shell completion scripts for metaportal

use crate::cli::output::print_success;
use crate::cli::Cli;
use clap::{Args, CommandFactory};
use clap_complete::{generate, generate_to, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory instead of stdout
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    match args.out_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let path = generate_to(args.shell, &mut cmd, bin, &dir)?;
            print_success(&format!("Wrote {} completions to {}", args.shell, path.display()));
        }
        None => generate(args.shell, &mut cmd, bin, &mut io::stdout()),
    }
    Ok(())
}
