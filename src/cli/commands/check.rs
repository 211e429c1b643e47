//! Check command - integrity check and repair of physical indexes

use crate::cli::output::{colors, format_bytes, print_output, print_warning};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::storage::CheckOutcome;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Physical index locations, or `*` for every index
    #[arg(required = true)]
    pub locations: Vec<String>,

    /// Repair corrupt indexes (refused while a target or reader still uses one)
    #[arg(long)]
    pub fix: bool,
}

/// Per-location result
#[derive(Debug, Serialize)]
pub struct CheckItem {
    pub location: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CheckOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub checked: usize,
    pub unhealthy: usize,
    pub results: Vec<CheckItem>,
}

/// Execute the check command
pub async fn execute(
    args: CheckArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let results: Vec<CheckItem> = services
        .admin
        .check_all(&args.locations, args.fix)?
        .into_iter()
        .map(|(location, result)| match result {
            Ok(outcome) => CheckItem {
                location,
                healthy: outcome.is_healthy(),
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => CheckItem {
                location,
                healthy: false,
                outcome: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let response = CheckResponse {
        checked: results.len(),
        unhealthy: results.iter().filter(|r| !r.healthy).count(),
        results,
    };

    print_output(&response, format, |response| {
        if response.results.is_empty() {
            println!("No physical indexes to check.");
        }
        for item in &response.results {
            let status = if item.healthy {
                colors::success("ok")
            } else {
                colors::error("FAILED")
            };
            println!("[{}] {}", status, colors::location(&item.location));
            if let Some(outcome) = &item.outcome {
                println!("    {}", outcome.summary());
                if outcome.report.size_bytes > 0 {
                    println!(
                        "    {}",
                        colors::dim(&format!("size: {}", format_bytes(outcome.report.size_bytes)))
                    );
                }
                for problem in &outcome.report.problems {
                    println!("    - {}", colors::dim(problem));
                }
            }
            if let Some(error) = &item.error {
                println!("    {}", colors::error(error));
            }
        }
    })?;

    if response.unhealthy > 0 {
        if !args.fix {
            print_warning("Run again with --fix to repair corrupt indexes");
        }
        return Err(format!("{} index(es) unhealthy", response.unhealthy).into());
    }
    Ok(())
}
