//! Rebuild command - build a target's alternate physical index and switch to it

use crate::cli::output::{print_output, print_success};
use crate::cli::OutputFormat;
use crate::core::services::Services;
use crate::core::types::MetadataRecord;
use clap::Args;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments for the rebuild command
#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Logical target id
    pub target: String,

    /// Records as JSON lines (one MetadataRecord per line)
    pub records: PathBuf,
}

/// Read JSON-lines records, skipping blank lines
pub fn read_records(path: &Path) -> Result<Vec<MetadataRecord>, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| format!("{}:{}: invalid record: {e}", path.display(), n + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Execute the rebuild command
pub async fn execute(
    args: RebuildArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(&args.records)?;
    let outcome = services.admin.rebuild(&args.target, &records)?;

    print_output(&outcome, format, |outcome| {
        print_success(&outcome.summary());
        if outcome.build.values_skipped > 0 {
            println!(
                "  {} field value(s) skipped (did not match the field type)",
                outcome.build.values_skipped
            );
        }
    })?;
    Ok(())
}
