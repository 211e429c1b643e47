//! Config command - show current configuration

use crate::cli::output::print_output;
use crate::cli::OutputFormat;
use crate::core::config::{CacheConfig, FieldConfig, IntegrityConfig, SearchConfig, TargetConfig};
use crate::core::services::Services;
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also list configured fields and targets
    #[arg(long, short = 'a')]
    pub all: bool,
}

/// Configuration response
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub index_dir: String,
    pub cache: CacheConfig,
    pub search: SearchConfig,
    pub integrity: IntegrityConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetConfig>,
}

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    services: &Arc<Services>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = &services.config;

    let response = ConfigResponse {
        index_dir: config.storage.index_dir.to_string_lossy().into_owned(),
        cache: config.cache.clone(),
        search: config.search.clone(),
        integrity: config.integrity.clone(),
        fields: if args.all {
            config.fields.clone()
        } else {
            Vec::new()
        },
        targets: if args.all {
            config.targets.clone()
        } else {
            Vec::new()
        },
    };

    print_output(&response, format, |response| {
        println!("Configuration:");
        println!("  index_dir: {}", response.index_dir);
        println!("  cache:");
        println!("    max_sessions: {}", response.cache.max_sessions);
        println!("    max_age_secs: {}", response.cache.max_age_secs);
        println!("  search:");
        println!("    default_page_size: {}", response.search.default_page_size);
        println!("    max_page_size: {}", response.search.max_page_size);
        println!("  integrity:");
        println!(
            "    reset_checkpoint_on_repair: {}",
            response.integrity.reset_checkpoint_on_repair
        );
        if !response.fields.is_empty() {
            println!("  fields:");
            for field in &response.fields {
                println!(
                    "    {} ({:?}{})",
                    field.name,
                    field.datatype,
                    if field.stored { ", stored" } else { "" }
                );
            }
        }
        if !response.targets.is_empty() {
            println!("  targets:");
            for target in &response.targets {
                println!("    {} -> [{}]", target.id, target.indexes.join(", "));
            }
        }
    })?;
    Ok(())
}
