//! CLI command implementations
//!
//! Each command module handles argument parsing and execution for a specific CLI command.

pub mod alias;
pub mod check;
pub mod completions;
pub mod config;
pub mod rebuild;
pub mod search;

// Re-export argument types for use in mod.rs
pub use alias::{AliasesArgs, SwapArgs};
pub use check::CheckArgs;
pub use completions::CompletionsArgs;
pub use config::ConfigArgs;
pub use rebuild::RebuildArgs;
pub use search::SearchArgs;
