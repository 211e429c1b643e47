//! CLI test helpers
//!
//! Provides utilities for testing CLI commands including:
//! - Arc<Services> wrappers matching CLI execute() signatures
//! - Targets seeded with sample records
//! - Record files in the JSON-lines format `rebuild` reads

use crate::common::test_fields;
use metaportal::core::config::Config;
use metaportal::core::services::Services;
use metaportal::core::types::MetadataRecord;
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

/// Create test services wrapped in Arc (matching CLI execute() signatures)
pub fn create_cli_test_services() -> (Arc<Services>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.storage.index_dir = temp_dir.path().to_path_buf();
    config.fields = test_fields();

    let services = Arc::new(Services::new(config).expect("Failed to create services"));
    (services, temp_dir)
}

/// Build `records` into a fresh physical index and point `target` at it
pub fn seed_target(services: &Arc<Services>, target: &str, records: &[MetadataRecord]) {
    services
        .admin
        .rebuild(target, records)
        .expect("Failed to seed target");
}

/// Write `records` as JSON lines
pub fn records_file(records: &[MetadataRecord]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create records file");
    for record in records {
        let line = serde_json::to_string(record).expect("Failed to serialize record");
        writeln!(file, "{line}").expect("Failed to write record");
    }
    file
}
