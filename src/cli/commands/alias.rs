//! Alias commands - `swap` repoints a target, `aliases` lists them

use crate::cli::output::{colors, format_age, print_header, print_output, print_success};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for swap
#[derive(Args, Debug)]
pub struct SwapArgs {
    /// Logical target id
    pub target: String,

    /// Physical index locations, in query order
    #[arg(required = true)]
    pub locations: Vec<String>,
}

/// Arguments for aliases
#[derive(Args, Debug)]
pub struct AliasesArgs {}

/// One physical index of a target
#[derive(Debug, Serialize)]
pub struct IndexInfo {
    pub location: String,
    pub documents: u64,
    pub references: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_harvested: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct TargetInfo {
    pub target: String,
    pub indexes: Vec<IndexInfo>,
}

#[derive(Debug, Serialize)]
pub struct AliasesResponse {
    pub count: usize,
    pub targets: Vec<TargetInfo>,
}

/// Execute the swap command
pub async fn execute_swap(
    args: SwapArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = services
        .admin
        .trigger_reindex(&args.target, &args.locations)?;

    print_output(&outcome, format, |outcome| {
        print_success(&outcome.summary());
    })?;
    Ok(())
}

/// Execute the aliases command
pub async fn execute_list(
    _args: AliasesArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut targets = Vec::new();
    for target in services.aliases.targets() {
        let entry = services.aliases.resolve(&target)?;
        let mut indexes = Vec::new();
        for handle in entry.handles() {
            let checkpoint = services.store.read_checkpoint(handle.location())?;
            indexes.push(IndexInfo {
                location: handle.location().to_string(),
                documents: handle.doc_count(),
                references: handle.ref_count(),
                last_harvested: checkpoint.map(|c| c.harvested_at),
            });
        }
        targets.push(TargetInfo { target, indexes });
    }

    let response = AliasesResponse {
        count: targets.len(),
        targets,
    };

    print_output(&response, format, |response| {
        if response.targets.is_empty() {
            println!(
                "No targets defined. Run '{}' to create one.",
                colors::label("metaportal swap <target> <location>")
            );
            return;
        }
        print_header(&format!("Targets ({})", response.count));
        let now = Utc::now();
        for target in &response.targets {
            println!("  {}", colors::target(&target.target));
            for index in &target.indexes {
                let harvested = index
                    .last_harvested
                    .as_ref()
                    .map(|at| format_age(at, now))
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "    {} {} {}",
                    colors::location(&index.location),
                    colors::number(&format!("{} docs", index.documents)),
                    colors::dim(&format!("(harvested {harvested})"))
                );
            }
        }
    })?;
    Ok(())
}
