//! Tests for the search CLI command
//!
//! Tests the search command handler with various scenarios:
//! - Valid queries with results, in both output formats
//! - Empty results
//! - Unknown targets and fields
//! - Query plans read from a file

use crate::cli::test_helpers::{create_cli_test_services, seed_target};
use crate::common::sample_records;
use metaportal::cli::commands::search::{execute, SearchArgs};
use metaportal::cli::OutputFormat;
use std::io::Write;
use tempfile::NamedTempFile;

fn args(target: &str, terms: &[&str]) -> SearchArgs {
    SearchArgs {
        target: target.to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
        all_of: Vec::new(),
        any_of: Vec::new(),
        range: Vec::new(),
        sort: None,
        plan: None,
        fields: Vec::new(),
        all_fields: false,
        xml: false,
        offset: 0,
        count: None,
    }
}

/// Test search with valid query returning results
#[tokio::test]
async fn test_search_valid_query_human() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 4));

    let mut args = args("main", &["reef", "survey"]);
    args.fields = vec!["title".to_string(), "year".to_string()];

    let result = execute(args, &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Search should succeed: {:?}", result.err());
}

/// Test search with valid query in JSON format
#[tokio::test]
async fn test_search_valid_query_json() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 4));

    let mut args = args("main", &["survey"]);
    args.all_fields = true;
    args.xml = true;
    args.count = Some(2);

    let result = execute(args, &services, OutputFormat::Json).await;
    assert!(
        result.is_ok(),
        "JSON search should succeed: {:?}",
        result.err()
    );
}

/// Test search with no matches
#[tokio::test]
async fn test_search_empty_results() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 2));

    let result = execute(args("main", &["glacier"]), &services, OutputFormat::Human).await;
    assert!(result.is_ok(), "Empty results are not an error");
}

/// Test search against a target that does not exist
#[tokio::test]
async fn test_search_unknown_target() {
    let (services, _storage_temp) = create_cli_test_services();

    let result = execute(args("nowhere", &["reef"]), &services, OutputFormat::Human).await;
    let err = result.expect_err("Unknown target should fail");
    assert!(err.to_string().contains("nowhere"));
}

/// Test field selection rejecting fields that are not stored
#[tokio::test]
async fn test_search_rejects_unstored_field() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 2));

    let mut args = args("main", &["reef"]);
    args.fields = vec!["notes".to_string()];

    let result = execute(args, &services, OutputFormat::Json).await;
    assert!(result.is_err());
}

/// Test a search with no constraints at all
#[tokio::test]
async fn test_search_without_constraints() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 2));

    let result = execute(args("main", &[]), &services, OutputFormat::Human).await;
    assert!(result.is_err());
}

/// Test a query plan read from a JSON file, combined with flags
#[tokio::test]
async fn test_search_plan_file() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 6));

    let mut plan = NamedTempFile::new().unwrap();
    write!(
        plan,
        r#"{{"ranges": [{{"field": "year", "min": 1951, "max": 1953}}]}}"#
    )
    .unwrap();

    let mut args = args("main", &["reef"]);
    args.plan = Some(plan.path().to_path_buf());
    args.sort = Some(metaportal::core::search::SortSpec {
        field: "year".to_string(),
        reverse: true,
    });

    let result = execute(args, &services, OutputFormat::Json).await;
    assert!(result.is_ok(), "Plan file search failed: {:?}", result.err());
}

/// Test an offset past the end of the results
#[tokio::test]
async fn test_search_offset_past_end() {
    let (services, _storage_temp) = create_cli_test_services();
    seed_target(&services, "main", &sample_records("reef", 2));

    let mut args = args("main", &["reef"]);
    args.offset = 10;

    let result = execute(args, &services, OutputFormat::Human).await;
    assert!(result.is_err());
}
